//! # Configuration Management Module
//!
//! Conversion runs are driven by a TOML file naming the record store, the
//! containers that play each role, and where built scripts and directives live.
//!
//! ## Configuration Structure
//!
//! - [`StoreConfig`] - Sled database location
//! - [`LegacyConfig`] - Legacy containers, in load order
//! - [`TargetConfig`] - Base game, converted master and output containers
//! - [`ScriptsConfig`] - Directory of built target scripts
//! - [`DirectivesConfig`] - Optional directive (metadata) file
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use formport::config::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     Config::create_default("formport.toml")?;
//!     let config = Config::load("formport.toml")?;
//!     println!("Output container: {}", config.target.output);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [store]
//! db_path = "./data/records"
//!
//! [legacy]
//! containers = ["Oblivion.esm"]
//!
//! [target]
//! base = "Skyrim.esm"
//! master = "Skyblivion.esm"
//! output = "GECK.esp"
//!
//! [scripts]
//! build_dir = "./build/scripts"
//!
//! [directives]
//! file = "./build/Metadata.txt"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyConfig {
    pub containers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub base: String,
    pub master: String,
    pub output: String,
    /// Load-order index given to the output container when it does not exist yet.
    #[serde(default = "default_output_load_order")]
    pub output_load_order: u8,
}

fn default_output_load_order() -> u8 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    pub build_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectivesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub legacy: LegacyConfig,
    pub target: TargetConfig,
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub directives: DirectivesConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.db_path.trim().is_empty() {
            return Err(anyhow!("store.db_path must not be empty"));
        }
        if self.legacy.containers.is_empty() {
            return Err(anyhow!("legacy.containers must name at least one container"));
        }
        if let Some(name) = self.legacy.containers.iter().find(|n| n.trim().is_empty()) {
            return Err(anyhow!("legacy.containers contains an empty name: {:?}", name));
        }

        let roles = [
            ("target.base", &self.target.base),
            ("target.master", &self.target.master),
            ("target.output", &self.target.output),
        ];
        let mut seen = HashSet::new();
        for (field, name) in roles {
            if name.trim().is_empty() {
                return Err(anyhow!("{} must not be empty", field));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(anyhow!("{} reuses container {}", field, name));
            }
        }
        if self
            .legacy
            .containers
            .iter()
            .any(|name| seen.contains(&name.to_ascii_lowercase()))
        {
            return Err(anyhow!("legacy and target containers must be distinct"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreConfig {
                db_path: "./data/records".to_string(),
            },
            legacy: LegacyConfig {
                containers: vec!["Oblivion.esm".to_string()],
            },
            target: TargetConfig {
                base: "Skyrim.esm".to_string(),
                master: "Skyblivion.esm".to_string(),
                output: "GECK.esp".to_string(),
                output_load_order: default_output_load_order(),
            },
            scripts: ScriptsConfig {
                build_dir: "./build/scripts".to_string(),
            },
            directives: DirectivesConfig {
                file: Some("./build/Metadata.txt".to_string()),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("formport.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_and_validates() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("formport.toml");
        let path = path.to_str().expect("utf8 path");
        Config::create_default(path).expect("write default");
        let config = Config::load(path).expect("load default");
        assert_eq!(config.target.output, "GECK.esp");
        assert_eq!(config.legacy.containers, vec!["Oblivion.esm".to_string()]);
    }

    #[test]
    fn duplicate_target_roles_are_rejected() {
        let mut config = Config::default();
        config.target.output = "skyblivion.ESM".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("target.output"));
    }

    #[test]
    fn legacy_and_target_must_differ() {
        let mut config = Config::default();
        config.legacy.containers.push("Skyrim.esm".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn sections_with_defaults_may_be_omitted() {
        let text = r#"
[store]
db_path = "db"

[legacy]
containers = ["Legacy.esm"]

[target]
base = "Base.esm"
master = "Master.esm"
output = "Out.esp"

[scripts]
build_dir = "scripts"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(text).expect("parse");
        assert!(config.directives.file.is_none());
        assert_eq!(config.target.output_load_order, 2);
        config.validate().expect("valid");
    }
}
