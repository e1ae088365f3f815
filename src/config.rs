use std::{env, fs, path::PathBuf};

use serde::Deserialize;

use crate::{
    error::{PredictorErr, Result},
    export::EXPORT_FILE_NAME,
};

/// Default location of the serialized estimator.
pub const DEFAULT_MODEL_PATH: &str = "HGB.json";

pub const MODEL_PATH_VAR: &str = "MB_MODEL_PATH";
pub const EXPORT_FILE_VAR: &str = "MB_EXPORT_FILE";

/// Deployment settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model_path: PathBuf,
    pub export_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            export_file_name: EXPORT_FILE_NAME.to_string(),
        }
    }
}

impl Config {
    /// Reads the configuration from `MB_MODEL_PATH` and `MB_EXPORT_FILE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from a variable lookup, unset or empty variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = var(MODEL_PATH_VAR) {
            config.model_path = path.into();
        }
        if let Some(name) = var(EXPORT_FILE_VAR) {
            config.export_file_name = name;
        }

        config
    }

    /// Loads a JSON configuration file, missing keys keep defaults.
    ///
    /// # Errors
    /// `Config` if the file cannot be read or parsed.
    pub fn from_json_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| PredictorErr::Config(format!("cannot read '{path}': {e}")))?;

        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| PredictorErr::Config(format!("invalid JSON: {e}")))?;

        if config.export_file_name.trim().is_empty() {
            return Err(PredictorErr::Config(
                "export_file_name must not be empty".into(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_lookup_overrides_defaults() {
        let vars = HashMap::from([(MODEL_PATH_VAR, "/srv/models/HGB.json")]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.model_path, PathBuf::from("/srv/models/HGB.json"));
        assert_eq!(config.export_file_name, EXPORT_FILE_NAME);
    }

    #[test]
    fn test_empty_variables_keep_defaults() {
        let config = Config::from_lookup(|_| Some(" ".into()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_json_partial() {
        let config = Config::from_json_str(r#"{ "model_path": "models/HGB.json" }"#).unwrap();
        assert_eq!(config.model_path, PathBuf::from("models/HGB.json"));
        assert_eq!(config.export_file_name, EXPORT_FILE_NAME);
    }

    #[test]
    fn test_json_errors() {
        assert!(matches!(
            Config::from_json_str("{ model_path"),
            Err(PredictorErr::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{ "export_file_name": "" }"#),
            Err(PredictorErr::Config(_))
        ));
        assert!(Config::from_json_file("/no/such/config.json").is_err());
    }
}
