use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming};

/// Directory the rotating log files are written to, relative to the working directory.
pub const LOG_DIRECTORY: &str = "logs";

/// Installs the process-wide logger: rotating files under [`LOG_DIRECTORY`],
/// warnings duplicated to stderr and everything duplicated to stdout.
///
/// The returned handle owns the file writer; keep it alive until exit.
pub fn setup_logging(base_level: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_str(base_level)?
        .log_to_file(
            FileSpec::default()
                .directory(LOG_DIRECTORY)
                .basename("coreg"),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .duplicate_to_stdout(Duplicate::All)
        .rotate(
            Criterion::Size(1024 * 1024), //1MB
            Naming::Timestamps,
            Cleanup::KeepLogFiles(5),
        )
        .start()
}
