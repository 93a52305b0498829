// ⚙️ Configuration - TOML, every field optional

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classifier::{Classifier, KeywordTable};
use crate::normalizer::NormalizeOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub import: ImportSection,
    pub classifier: ClassifierSection,
    pub analysis: AnalysisSection,
    pub server: ServerSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    pub auto_detect_header: bool,
    pub skip_rows: usize,
    pub header_scan_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    /// JSON keyword table replacing the built-in one
    pub keywords_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub top_merchants: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub addr: String,
    pub max_upload_bytes: usize,
    /// Oldest session is dropped when a new upload would exceed this
    pub max_sessions: usize,
}

impl Default for ImportSection {
    fn default() -> Self {
        let options = NormalizeOptions::default();
        Self {
            auto_detect_header: options.auto_detect_header,
            skip_rows: options.skip_rows,
            header_scan_rows: options.header_scan_rows,
        }
    }
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self { top_merchants: 5 }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            max_sessions: 16,
        }
    }
}

impl AppConfig {
    /// Load from a TOML file; no path means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&s).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            auto_detect_header: self.import.auto_detect_header,
            skip_rows: self.import.skip_rows,
            header_scan_rows: self.import.header_scan_rows,
        }
    }

    /// Classifier over the configured keyword table (built-in when unset)
    pub fn build_classifier(&self) -> Result<Classifier> {
        let table = match &self.classifier.keywords_file {
            Some(path) => KeywordTable::from_file(path)?,
            None => KeywordTable::default_table(),
        };
        Ok(Classifier::new(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = AppConfig::load(None).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert!(cfg.import.auto_detect_header);
        assert_eq!(cfg.import.header_scan_rows, 20);
        assert_eq!(cfg.analysis.top_merchants, 5);
        assert_eq!(cfg.server.addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_partial_toml() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [import]
            auto_detect_header = false
            skip_rows = 6

            [server]
            max_sessions = 2
            "#,
        )
        .unwrap();

        assert_eq!(cfg.normalize_options().skip_rows, 6);
        assert!(!cfg.normalize_options().auto_detect_header);
        assert_eq!(cfg.import.header_scan_rows, 20);
        assert_eq!(cfg.server.max_sessions, 2);
        assert_eq!(cfg.server.addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AppConfig::from_toml_str("[import]\nskip_rows = \"six\"").is_err());
        assert!(AppConfig::load(Some(Path::new("/no/such/config.toml"))).is_err());
    }

    #[test]
    fn test_keywords_file_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let keywords = dir.path().join("keywords.json");
        fs::write(&keywords, r#"[{"category": "Groceries", "keywords": ["corner store"]}]"#).unwrap();

        let config_path = dir.path().join("config.toml");
        let mut file = fs::File::create(&config_path).unwrap();
        writeln!(file, "[classifier]\nkeywords_file = {:?}", keywords.display().to_string()).unwrap();

        let cfg = AppConfig::load(Some(&config_path)).unwrap();
        let classifier = cfg.build_classifier().unwrap();
        assert_eq!(classifier.classify("CORNER STORE 12"), Category::Groceries);
        assert_eq!(classifier.classify("Starbucks"), Category::Other);
    }
}
