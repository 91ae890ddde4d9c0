//! Configuration loading for VoltageEMS tools
//!
//! Files are read through figment; the format follows the extension
//! (`.yaml`/`.yml`, `.toml`, `.json`). [`load_config`] additionally layers
//! prefixed environment variables on top, with `__` separating nested keys
//! (`IOPOINT_SIM_CYCLE_INTERVAL_MS=250`).

use crate::{Error, Result};
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::Deserialize;
use std::path::Path;

fn file_figment(path: &Path) -> Result<Figment> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Config("Config file must have an extension".to_string()))?;

    let figment = match extension {
        "toml" => Figment::new().merge(Toml::file(path)),
        "yaml" | "yml" => Figment::new().merge(Yaml::file(path)),
        "json" => Figment::new().merge(Json::file(path)),
        _ => {
            return Err(Error::Config(format!(
                "Unsupported config file format: {}",
                extension
            )))
        },
    };
    Ok(figment)
}

/// Load configuration from a specific file
pub fn load_config_from_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    file_figment(path)?
        .extract()
        .map_err(|e| Error::Config(format!("Failed to load configuration from file: {}", e)))
}

/// Load configuration from an optional file plus prefixed environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables starting with `env_prefix`
/// 2. The config file, if given
/// 3. Serde defaults of `T`
pub fn load_config<T>(path: Option<&Path>, env_prefix: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let figment = match path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            file_figment(path)?
        },
        None => Figment::new(),
    };

    figment
        .merge(Env::prefixed(env_prefix).split("__"))
        .extract()
        .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde::Serialize;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct TestConfig {
        name: String,
        #[serde(default = "default_interval")]
        interval_ms: u64,
        #[serde(default)]
        points: Vec<String>,
    }

    fn default_interval() -> u64 {
        1000
    }

    fn sample() -> TestConfig {
        TestConfig {
            name: "sim".to_string(),
            interval_ms: 250,
            points: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[test]
    fn test_load_yaml_and_json() {
        let dir = TempDir::new().unwrap();

        let yaml_path = dir.path().join("config.yaml");
        std::fs::write(&yaml_path, serde_yaml::to_string(&sample()).unwrap()).unwrap();
        let loaded: TestConfig = load_config_from_file(&yaml_path).unwrap();
        assert_eq!(loaded, sample());

        let json_path = dir.path().join("config.json");
        std::fs::write(&json_path, serde_json::to_string(&sample()).unwrap()).unwrap();
        let loaded: TestConfig = load_config_from_file(&json_path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "name = \"plain\"\n").unwrap();

        let loaded: TestConfig = load_config_from_file(&path).unwrap();
        assert_eq!(loaded.name, "plain");
        assert_eq!(loaded.interval_ms, 1000);
        assert!(loaded.points.is_empty());
    }

    #[test]
    fn test_unsupported_and_missing_files() {
        let dir = TempDir::new().unwrap();
        let ini = dir.path().join("config.ini");
        std::fs::write(&ini, "name=x").unwrap();
        assert!(matches!(
            load_config_from_file::<TestConfig, _>(&ini),
            Err(Error::Config(_))
        ));

        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            load_config_from_file::<TestConfig, _>(&missing),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "name: from-file\ninterval_ms: 10\n").unwrap();

        std::env::set_var("COMMON_CFG_TEST_INTERVAL_MS", "42");
        let loaded: TestConfig = load_config(Some(&path), "COMMON_CFG_TEST_").unwrap();
        std::env::remove_var("COMMON_CFG_TEST_INTERVAL_MS");

        assert_eq!(loaded.name, "from-file");
        assert_eq!(loaded.interval_ms, 42);
    }
}
