//! Engine configuration.
//!
//! Every tunable the correction pipeline reads lives here: source locations for the
//! reference lists, one acceptance threshold per strategy, feature switches for the
//! optional strategies, and the identifier-column heuristic.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CleanError, Result};

/// File locations of everything the catalog and dictionary load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sources {
    /// Line-delimited lowercase protected terms.
    pub whitelist: Option<PathBuf>,
    /// JSON object, lowercase original -> canonical replacement.
    pub user_mappings: Option<PathBuf>,
    pub names: Option<PathBuf>,
    pub cities: Option<PathBuf>,
    pub countries: Option<PathBuf>,
    pub companies: Option<PathBuf>,
    /// Directory holding `*.aff`/`*.dic` Hunspell files and `words.txt`.
    pub dictionary_dir: Option<PathBuf>,
    /// Gazetteer for the named-entity detector, `kind<TAB>entity` per line.
    pub entities: Option<PathBuf>,
}

impl Sources {
    /// All sources rooted in one data directory, using the default file names.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            whitelist: Some(dir.join("whitelist.txt")),
            user_mappings: Some(dir.join("user_mappings.json")),
            names: Some(dir.join("names.txt")),
            cities: Some(dir.join("cities.txt")),
            countries: Some(dir.join("countries.txt")),
            companies: Some(dir.join("companies.txt")),
            dictionary_dir: Some(dir.join("dictionaries")),
            entities: Some(dir.join("entities.tsv")),
        }
    }
}

/// Acceptance threshold per strategy, all on a 0.0-1.0 scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub dictionary: f64,
    /// Names, cities and countries: curated lists tolerate looser matches.
    pub fuzzy_curated: f64,
    /// Companies and anything without a curated list.
    pub fuzzy_free_text: f64,
    pub embedding: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            dictionary: 0.70,
            fuzzy_curated: 0.80,
            fuzzy_free_text: 0.88,
            embedding: 0.60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub sources: Sources,
    pub thresholds: Thresholds,
    pub enable_embedding: bool,
    /// HuggingFace model for the embedding strategy; unset uses n-gram vectors.
    pub embedding_model: Option<String>,
    pub enable_generative: bool,
    pub enable_ner: bool,
    pub generative_timeout_ms: u64,
    pub identifier_keywords: Vec<String>,
    /// Share of observed values that must look like short numbers to flag a column.
    pub identifier_numeric_ratio: f64,
    pub identifier_max_len: usize,
    /// Batch worker threads, 0 lets rayon decide.
    pub workers: usize,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            sources: Sources::default(),
            thresholds: Thresholds::default(),
            enable_embedding: true,
            embedding_model: None,
            enable_generative: false,
            enable_ner: false,
            generative_timeout_ms: 3000,
            identifier_keywords: ["id", "roll", "phone", "code", "zip", "pin", "uuid", "sku"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            identifier_numeric_ratio: 0.8,
            identifier_max_len: 12,
            workers: 0,
        }
    }
}

impl CorrectionConfig {
    /// Load config from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| CleanError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Defaults with every source placed under the platform data directory.
    pub fn in_default_data_dir() -> Self {
        Self {
            sources: Sources::in_dir(&Self::default_data_dir()),
            ..Self::default()
        }
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rust-field-clean")
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        for (name, value) in [
            ("dictionary", t.dictionary),
            ("fuzzy_curated", t.fuzzy_curated),
            ("fuzzy_free_text", t.fuzzy_free_text),
            ("embedding", t.embedding),
            ("identifier_numeric_ratio", self.identifier_numeric_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CleanError::Config(format!(
                    "{} must be within 0.0..=1.0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CorrectionConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.thresholds.dictionary, 0.70);
        assert!(config.enable_embedding);
        assert!(!config.enable_generative);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"thresholds": {"fuzzy_curated": 0.9}, "workers": 2}"#).unwrap();

        let config = CorrectionConfig::load(&path).unwrap();
        assert_eq!(config.thresholds.fuzzy_curated, 0.9);
        assert_eq!(config.thresholds.fuzzy_free_text, 0.88);
        assert_eq!(config.workers, 2);
        assert!(config.identifier_keywords.contains(&"roll".to_string()));
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"thresholds": {"embedding": 75}}"#).unwrap();
        assert!(matches!(CorrectionConfig::load(&path), Err(CleanError::Config(_))));
    }
}
