use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output format: "plain" or "pretty"
    pub format: String,

    /// Use ANSI colors in pretty output
    pub color: bool,

    /// Truncate comment bodies to this many characters in listings (0 = no limit)
    pub body_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
            color: true,
            body_limit: 0,
        }
    }
}

impl Config {
    /// Get the config file path (~/.config/prq/config.toml)
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("prq").join("config.toml"))
    }

    /// Load configuration from file, or return default if not found
    pub fn load() -> Self {
        let path = match Self::config_path() {
            Some(p) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn is_plain_default(&self) -> bool {
        self.format.to_lowercase() == "plain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.format, "pretty");
        assert!(config.color);
        assert_eq!(config.body_limit, 0);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
format = "plain"
color = false
body_limit = 120
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.format, "plain");
        assert!(!config.color);
        assert_eq!(config.body_limit, 120);
    }

    #[test]
    fn test_parse_toml_partial() {
        // Should use defaults for missing fields
        let config: Config = toml::from_str(r#"color = false"#).unwrap();
        assert_eq!(config.format, "pretty");
        assert!(!config.color);
    }

    #[test]
    fn test_is_plain_default() {
        let mut config = Config::default();
        assert!(!config.is_plain_default());

        config.format = "plain".to_string();
        assert!(config.is_plain_default());

        config.format = "PLAIN".to_string();
        assert!(config.is_plain_default());
    }
}
