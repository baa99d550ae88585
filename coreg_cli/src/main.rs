//! coreg: align every band of every capture in a directory.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use common::file_utils::band_image_files;
use coreg::{AlignConfig, FileSink, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "coreg")]
#[command(about = "Co-register multi-band aerial captures using their embedded calibration metadata")]
#[command(version)]
struct Cli {
    /// Directory with the source band images (TIFF / JPEG).
    #[arg(default_value = "input")]
    source_dir: PathBuf,

    /// Directory the aligned images are written to; created if missing.
    #[arg(default_value = "output")]
    dest_dir: PathBuf,

    /// YAML or JSON alignment configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip photometric refinement, use metadata alignment only.
    #[arg(long)]
    no_refine: bool,

    /// Process the bands of a capture one at a time.
    #[arg(long)]
    sequential: bool,

    /// Log level or flexi_logger spec, e.g. `info` or `debug, coreg=trace`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Nothing, not even the log directory, is created when this fails.
    if let Err(err) = preflight(&cli) {
        eprintln!("{err}\n\n{}", Cli::command().render_usage());
        return ExitCode::FAILURE;
    }

    let _logger = match common::setup_logging(&cli.log_level) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("Logging disabled: {err}");
            None
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn preflight(cli: &Cli) -> Result<()> {
    if !cli.source_dir.is_dir() {
        bail!("Source directory '{}' not found.", cli.source_dir.display());
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AlignConfig> {
    let mut config = match &cli.config {
        Some(path) => AlignConfig::from_file(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => AlignConfig::default(),
    };
    if cli.no_refine {
        config.refine = false;
    }
    if cli.sequential {
        config.parallel = false;
    }
    Ok(config)
}

fn scan(source_dir: &Path) -> Result<Vec<PathBuf>> {
    band_image_files(source_dir)
        .with_context(|| format!("Failed to list '{}'", source_dir.display()))
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let sink = FileSink::create(&cli.dest_dir).with_context(|| {
        format!(
            "Failed to create destination '{}'",
            cli.dest_dir.display()
        )
    })?;

    log::info!("Co-registration running");
    log::info!("Scanning {}...", cli.source_dir.display());
    let paths = scan(&cli.source_dir)?;
    log::info!("Found {} band images", paths.len());

    let pipeline = Pipeline::new(config, Box::new(sink));
    pipeline.run(&paths);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["coreg"]);
        assert_eq!(cli.source_dir, PathBuf::from("input"));
        assert_eq!(cli.dest_dir, PathBuf::from("output"));
        assert!(!cli.no_refine);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["coreg", "src", "dst", "--no-refine", "--sequential"]);
        assert_eq!(cli.source_dir, PathBuf::from("src"));
        let config = load_config(&cli).unwrap();
        assert!(!config.refine);
        assert!(!config.parallel);
        assert_eq!(config.ecc.max_iterations, 50);
    }

    #[test]
    fn test_preflight_rejects_missing_source_dir() {
        let cli = Cli::parse_from(["coreg", "/nonexistent/coreg_src", "out"]);
        let err = preflight(&cli).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Source directory '/nonexistent/coreg_src' not found."
        );
    }

    #[test]
    fn test_preflight_accepts_existing_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().to_str().unwrap();
        let cli = Cli::parse_from(["coreg", source]);
        preflight(&cli).unwrap();
    }

    #[test]
    fn test_missing_config_file_fails() {
        let cli = Cli::parse_from(["coreg", "--config", "/nonexistent/coreg.yaml"]);
        assert!(load_config(&cli).is_err());
    }
}
