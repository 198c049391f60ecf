//! Parameters of an analysis run
use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::parser::open_file;
use crate::{Aspect, GoError, GoResult, DEFAULT_ALPHA, DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_CLUSTER_SIZE};

/// Parameters of an analysis run
///
/// Every field has a default, so a configuration file only needs to
/// list the values that differ:
///
/// ```json
/// {"alpha": 0.01, "aspect": "biological_process", "exclude_evidence_codes": ["IEA"]}
/// ```
///
/// # Examples
///
/// ```
/// use gbsc_enrich::{Aspect, Config};
///
/// let config = Config::default();
/// assert_eq!(config.aspect, Aspect::MolecularFunction);
/// assert_eq!(config.min_cluster_size, 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Significance level of both corrections
    pub alpha: f64,
    /// The GO aspect to analyse
    pub aspect: Aspect,
    /// Smallest cluster (annotated proteins) eligible for the ranking
    pub min_cluster_size: usize,
    /// Annotations with these evidence codes are ignored, e.g. `IEA`
    pub exclude_evidence_codes: HashSet<String>,
    /// Attempts per ontology request
    pub max_attempts: usize,
    /// Worker threads for the enrichment, `None` uses one per CPU
    pub workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            aspect: Aspect::default(),
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            exclude_evidence_codes: HashSet::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            workers: None,
        }
    }
}

impl Config {
    /// Reads a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// - [`GoError::CannotOpenFile`] if the file cannot be opened
    /// - [`GoError::Json`] if the file is not a valid configuration
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> GoResult<Self> {
        let config: Config = serde_json::from_reader(open_file(path)?)?;
        Ok(config)
    }

    /// Checks that all values are usable
    ///
    /// # Errors
    ///
    /// [`GoError::InvalidConfig`] naming the first invalid value
    pub fn validate(&self) -> GoResult<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(GoError::InvalidConfig(format!(
                "alpha must be between 0 and 1, not {}",
                self.alpha
            )));
        }
        if self.min_cluster_size == 0 {
            return Err(GoError::InvalidConfig(
                "min_cluster_size must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(GoError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(GoError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!((config.alpha - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.max_attempts, 10);
        assert!(config.exclude_evidence_codes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_values() {
        for alpha in [0.0, 1.0, -0.1, f64::NAN] {
            let config = Config {
                alpha,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(GoError::InvalidConfig(_))));
        }
        let config = Config {
            min_cluster_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = Config {
            workers: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(br#"{"alpha": 0.01, "aspect": "biological_process", "exclude_evidence_codes": ["IEA"]}"#)
            .unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert!((config.alpha - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.aspect, Aspect::BiologicalProcess);
        assert!(config.exclude_evidence_codes.contains("IEA"));
        assert_eq!(config.min_cluster_size, 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"alhpa": 0.01}"#).unwrap();
        assert!(matches!(Config::from_json_file(&path), Err(GoError::Json(_))));
    }
}
