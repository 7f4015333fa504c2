use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants::{DEFAULT_MATH_TOLERANCE, MIN_WEIGHT_PRICING_CONFIDENCE};
use crate::error::{ExtractorError, Result};

/// Knobs a single processing run is parameterized by
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Allowed absolute gap between expected and actual totals
    pub math_tolerance: f64,
    /// Weight extractions below this confidence fall back to unit pricing
    pub min_weight_confidence: u8,
    /// Added to 1-based positions when numbering lines, for chunked input
    pub line_number_offset: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            math_tolerance: DEFAULT_MATH_TOLERANCE,
            min_weight_confidence: MIN_WEIGHT_PRICING_CONFIDENCE,
            line_number_offset: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub processing: ProcessingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_math_tolerance")]
    pub math_tolerance: f64,
    #[serde(default = "default_min_weight_confidence")]
    pub min_weight_confidence: u8,
}

fn default_math_tolerance() -> f64 {
    DEFAULT_MATH_TOLERANCE
}

fn default_min_weight_confidence() -> u8 {
    MIN_WEIGHT_PRICING_CONFIDENCE
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            math_tolerance: default_math_tolerance(),
            min_weight_confidence: default_min_weight_confidence(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExtractorError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `extractor.toml` from the working directory if present;
    /// otherwise fall back to defaults
    pub fn load_or_default() -> Self {
        let path = Path::new("extractor.toml");
        if path.exists() {
            EngineConfig::load(path).unwrap_or_default()
        } else {
            EngineConfig::default()
        }
    }

    pub fn to_options(&self) -> ProcessOptions {
        ProcessOptions {
            math_tolerance: self.processing.math_tolerance,
            min_weight_confidence: self.processing.min_weight_confidence,
            line_number_offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_documented_knobs() {
        let options = ProcessOptions::default();
        assert_eq!(options.math_tolerance, 0.02);
        assert_eq!(options.min_weight_confidence, 70);
        assert_eq!(options.line_number_offset, 0);
    }

    #[test]
    fn loads_processing_section_from_toml() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[processing]\nmath_tolerance = 0.05").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        let options = config.to_options();
        assert_eq!(options.math_tolerance, 0.05);
        // unset keys keep their defaults
        assert_eq!(options.min_weight_confidence, 70);
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let err = EngineConfig::load(Path::new("/nonexistent/extractor.toml")).unwrap_err();
        assert!(matches!(err, ExtractorError::Config(_)));
    }
}
