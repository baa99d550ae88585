//! Alignment configuration.

use std::fs;
use std::path::Path;

use common::file_format::{self, SerdeFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interpolation::InterpolationMethod;
use crate::refine::EccParams;

/// Alignment configuration.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// A band is the reference when both relative optical-center offsets are
    /// below this value.
    pub reference_tolerance: f64,
    /// Relative offsets above this value produce a metadata translation.
    pub translation_tolerance: f64,

    /// Run photometric refinement against the reference band.
    pub refine: bool,
    pub ecc: EccParams,

    /// Resampling used for undistortion and warping.
    pub interpolation: InterpolationMethod,
    /// Value written where the source frame has no data.
    pub border_value: f32,

    /// Process the non-reference records of a group in parallel.
    pub parallel: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            reference_tolerance: 0.001,
            translation_tolerance: 0.0001,
            refine: true,
            ecc: EccParams::default(),
            interpolation: InterpolationMethod::Bilinear,
            border_value: 0.0,
            parallel: true,
        }
    }
}

impl AlignConfig {
    /// Load a YAML or JSON file, chosen by extension, and validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path.to_string_lossy();
        let format = SerdeFormat::from_file_name(&file_name)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config: AlignConfig = file_format::deserialize(&text, format)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        file_format::serialize(self, SerdeFormat::Yaml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        let check = |ok: bool, msg: &str| {
            if ok {
                Ok(())
            } else {
                Err(Error::Config(msg.to_string()))
            }
        };

        check(
            self.reference_tolerance.is_finite() && self.reference_tolerance > 0.0,
            "reference_tolerance must be positive",
        )?;
        check(
            self.translation_tolerance.is_finite() && self.translation_tolerance >= 0.0,
            "translation_tolerance must be non-negative",
        )?;
        check(
            self.ecc.max_iterations > 0,
            "ecc.max_iterations must be positive",
        )?;
        check(
            self.ecc.epsilon.is_finite() && self.ecc.epsilon >= 0.0,
            "ecc.epsilon must be non-negative",
        )?;
        check(
            self.ecc.gauss_kernel == 0 || self.ecc.gauss_kernel % 2 == 1,
            "ecc.gauss_kernel must be 0 or odd",
        )?;
        check(
            self.border_value.is_finite(),
            "border_value must be finite",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AlignConfig::default();
        assert_eq!(config.reference_tolerance, 0.001);
        assert_eq!(config.translation_tolerance, 0.0001);
        assert!(config.refine);
        assert_eq!(config.ecc.max_iterations, 50);
        assert_eq!(config.ecc.epsilon, 1e-3);
        assert_eq!(config.ecc.gauss_kernel, 5);
        assert_eq!(config.interpolation, InterpolationMethod::Bilinear);
        assert_eq!(config.border_value, 0.0);
        assert!(config.parallel);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coreg.yaml");
        fs::write(
            &path,
            "refine: false\ninterpolation: bicubic\necc:\n  max_iterations: 20\n",
        )
        .unwrap();

        let config = AlignConfig::from_file(&path).unwrap();
        assert!(!config.refine);
        assert_eq!(config.interpolation, InterpolationMethod::Bicubic);
        assert_eq!(config.ecc.max_iterations, 20);
        assert_eq!(config.ecc.epsilon, 1e-3);
        assert_eq!(config.reference_tolerance, 0.001);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = AlignConfig {
            parallel: false,
            border_value: 12.0,
            ..Default::default()
        };
        let text = config.to_yaml().unwrap();
        let back: AlignConfig = file_format::deserialize(&text, SerdeFormat::Yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = AlignConfig::default();
        config.ecc.gauss_kernel = 4;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = AlignConfig {
            reference_tolerance: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coreg.yaml");
        fs::write(&path, "refine: [not a bool").unwrap();
        assert!(matches!(AlignConfig::from_file(&path), Err(Error::Config(_))));

        let path = dir.path().join("coreg.toml");
        fs::write(&path, "refine = false").unwrap();
        assert!(matches!(AlignConfig::from_file(&path), Err(Error::Config(_))));

        assert!(matches!(
            AlignConfig::from_file(&dir.path().join("missing.yaml")),
            Err(Error::Io { .. })
        ));
    }
}
