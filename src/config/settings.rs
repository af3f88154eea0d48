//! Configuration settings and validation.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default number of documents shown per report.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Default report period in seconds.
pub const DEFAULT_PERIOD_SECS: u64 = 30;

/// Default token separator.
pub const DEFAULT_SEPARATOR: &str = " ";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration for the termrank daemon.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the documents to rank.
    pub directory: PathBuf,

    /// Additional directories to seed from and watch.
    pub extra_dirs: Vec<PathBuf>,

    /// Terms to score documents against.
    pub terms: Vec<String>,

    /// Number of documents shown per report.
    pub max_results: usize,

    /// Report period in seconds.
    pub period_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// File that reports are appended to. Stdout when unset.
    pub output: Option<PathBuf>,

    /// Token separator used when reading documents.
    pub separator: String,

    /// Re-attempt documents that failed to index on each refresh.
    pub retry_failed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            extra_dirs: Vec::new(),
            terms: Vec::new(),
            max_results: DEFAULT_MAX_RESULTS,
            period_secs: DEFAULT_PERIOD_SECS,
            log_level: "warn".to_string(),
            output: None,
            separator: DEFAULT_SEPARATOR.to_string(),
            retry_failed: false,
        }
    }
}

impl Config {
    /// Split a space separated term list, dropping empty and repeated terms.
    #[must_use]
    pub fn parse_terms(raw: &str) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for term in raw.split(' ').filter(|t| !t.is_empty()) {
            if !terms.iter().any(|t| t == term) {
                terms.push(term.to_string());
            }
        }
        terms
    }

    /// Map a `-v` count to a log level.
    #[must_use]
    pub fn level_for_verbosity(verbosity: u8) -> &'static str {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Replace zero `max_results` or `period_secs` with their defaults.
    pub fn normalize(&mut self) {
        if self.max_results == 0 {
            tracing::warn!(
                default = DEFAULT_MAX_RESULTS,
                "max results must be positive, using default"
            );
            self.max_results = DEFAULT_MAX_RESULTS;
        }
        if self.period_secs == 0 {
            tracing::warn!(
                default = DEFAULT_PERIOD_SECS,
                "period must be positive, using default"
            );
            self.period_secs = DEFAULT_PERIOD_SECS;
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.directory.exists() {
            return Err(Error::config(format!(
                "cannot access \"{}\" directory",
                self.directory.display()
            )));
        }

        if !self.directory.is_dir() {
            return Err(Error::config(format!(
                "\"{}\" is not a directory",
                self.directory.display()
            )));
        }

        if self.terms.is_empty() {
            return Err(Error::config("no terms supplied"));
        }

        if !VALID_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                VALID_LEVELS.join(", ")
            )));
        }

        if self.separator.is_empty() {
            return Err(Error::config("separator cannot be empty"));
        }

        Ok(())
    }

    /// Report period as a duration.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Every directory to seed from and watch, input directory first.
    #[must_use]
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.directory.clone()];
        for dir in &self.extra_dirs {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_config(dir: &TempDir) -> Config {
        Config {
            directory: dir.path().to_path_buf(),
            terms: vec!["rust".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_results, 5);
        assert_eq!(config.period_secs, 30);
        assert_eq!(config.separator, " ");
        assert!(!config.retry_failed);
    }

    #[test]
    fn test_validate_ok() {
        let tmp = TempDir::new().unwrap();
        assert!(valid_config(&tmp).validate().is_ok());
    }

    #[test]
    fn test_validate_missing_directory() {
        let config = Config {
            directory: PathBuf::from("/nonexistent/termrank/docs"),
            terms: vec!["a".to_string()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cannot access"));
    }

    #[test]
    fn test_validate_file_is_not_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("doc.txt");
        std::fs::write(&file, "text").unwrap();

        let config = Config {
            directory: file,
            terms: vec!["a".to_string()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_validate_no_terms() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            terms: Vec::new(),
            ..valid_config(&tmp)
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no terms"));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            log_level: "loud".to_string(),
            ..valid_config(&tmp)
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log level"));
    }

    #[test]
    fn test_validate_empty_separator() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            separator: String::new(),
            ..valid_config(&tmp)
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("separator"));
    }

    #[test]
    fn test_parse_terms() {
        assert_eq!(
            Config::parse_terms("Dummy test  string test"),
            vec!["Dummy", "test", "string"]
        );
        assert!(Config::parse_terms("   ").is_empty());
    }

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(Config::level_for_verbosity(0), "warn");
        assert_eq!(Config::level_for_verbosity(1), "info");
        assert_eq!(Config::level_for_verbosity(2), "debug");
        assert_eq!(Config::level_for_verbosity(3), "trace");
        assert_eq!(Config::level_for_verbosity(7), "trace");
    }

    #[test]
    fn test_normalize_zero_values() {
        let mut config = Config {
            max_results: 0,
            period_secs: 0,
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(config.period(), Duration::from_secs(DEFAULT_PERIOD_SECS));
    }

    #[test]
    fn test_watch_dirs_deduplicated() {
        let config = Config {
            directory: PathBuf::from("/docs"),
            extra_dirs: vec![PathBuf::from("/more"), PathBuf::from("/docs")],
            ..Default::default()
        };
        assert_eq!(
            config.watch_dirs(),
            vec![PathBuf::from("/docs"), PathBuf::from("/more")]
        );
    }
}
