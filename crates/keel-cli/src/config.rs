use anyhow::{Context, Result};
use keel_syntax::ParseOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_true")]
    pub colored: bool,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Diagnostics rendered per file; 0 shows all of them.
    #[serde(default)]
    pub max_errors: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    keel_syntax::parser::DEFAULT_MAX_DEPTH
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            colored: true,
            max_depth: default_max_depth(),
            max_errors: 0,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load config from .keelrc (TOML format)
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from(".keelrc"),
            PathBuf::from(".keelrc.toml"),
            PathBuf::from(".config/keelrc"),
        ];

        for path in config_paths {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Config::default())
    }

    /// Load config from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Merge CLI arguments into config
    pub fn merge_cli_args(
        &mut self,
        no_color: bool,
        verbose: u8,
        max_depth: Option<usize>,
        max_errors: Option<usize>,
    ) {
        if no_color {
            self.colored = false;
        }

        match verbose {
            0 => {}
            1 => self.log_level = "debug".to_string(),
            _ => self.log_level = "trace".to_string(),
        }

        if let Some(depth) = max_depth {
            self.max_depth = depth;
        }

        if let Some(limit) = max_errors {
            self.max_errors = limit;
        }
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_depth: self.max_depth,
        }
    }

    pub fn level(&self) -> tracing::Level {
        match self.log_level.to_ascii_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "info" => tracing::Level::INFO,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::WARN,
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert!(config.colored);
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.max_errors, 0);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "colored = false\nmax_errors = 5").unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert!(!config.colored);
        assert_eq!(config.max_errors, 5);
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_depth = \"deep\"").unwrap();

        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn test_cli_args_override_file() {
        let mut config = Config::default();
        config.merge_cli_args(true, 2, Some(32), None);

        assert!(!config.colored);
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.parse_options().max_depth, 32);
        assert_eq!(config.max_errors, 0);
        assert_eq!(config.level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_toml_output_loads_back() {
        let mut config = Config::default();
        config.max_errors = 3;

        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
