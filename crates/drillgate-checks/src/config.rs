//! Gate configuration (`drillgate.toml`).

use drillgate_graph::{DEFAULT_MAX_PARSE_ERRORS, LoadOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Whether stored analytics must match recomputation exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsMode {
    /// Mismatches are hard failures.
    #[default]
    Authoritative,
    /// Mismatches are warnings; for content produced before recomputation
    /// was enforced.
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearDuplicateScope {
    #[default]
    WithinEntry,
    Workspace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    pub url_prefix: String,
    pub analytics_mode: AnalyticsMode,
    pub near_duplicate_threshold: f64,
    pub near_duplicate_scope: NearDuplicateScope,
    pub min_prompt_diversity: f64,
    pub min_scenario_coverage: f64,
    pub max_parse_errors: usize,
    /// Upper bound on concurrently validated workspaces.
    pub workers: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            url_prefix: String::new(),
            analytics_mode: AnalyticsMode::default(),
            near_duplicate_threshold: 0.85,
            near_duplicate_scope: NearDuplicateScope::default(),
            min_prompt_diversity: 0.3,
            min_scenario_coverage: 0.5,
            max_parse_errors: DEFAULT_MAX_PARSE_ERRORS,
            workers: 4,
        }
    }
}

impl GateConfig {
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.near_duplicate_threshold;
        if !(t.is_finite() && t > 0.0 && t <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "near_duplicate_threshold must be in (0, 1], got {t}"
            )));
        }
        for (name, value) in [
            ("min_prompt_diversity", self.min_prompt_diversity),
            ("min_scenario_coverage", self.min_scenario_coverage),
        ] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            url_prefix: self.url_prefix.clone(),
            max_parse_errors: self.max_parse_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = GateConfig::from_toml_str("", "inline").unwrap();
        assert_eq!(config, GateConfig::default());
        assert_eq!(config.analytics_mode, AnalyticsMode::Authoritative);
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let config = GateConfig::from_toml_str(
            r#"
url_prefix = "v1/"
analytics_mode = "legacy"
near_duplicate_scope = "workspace"
workers = 2
"#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.url_prefix, "v1/");
        assert_eq!(config.analytics_mode, AnalyticsMode::Legacy);
        assert_eq!(config.near_duplicate_scope, NearDuplicateScope::Workspace);
        assert_eq!(config.workers, 2);
        assert_eq!(config.near_duplicate_threshold, 0.85);
        assert_eq!(config.load_options().url_prefix, "v1/");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for text in [
            "near_duplicate_threshold = 0.0",
            "near_duplicate_threshold = 1.5",
            "min_scenario_coverage = -0.1",
            "workers = 0",
        ] {
            let err = GateConfig::from_toml_str(text, "inline").unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{text}: {err}");
        }
    }

    #[test]
    fn unknown_keys_and_bad_enums_fail_to_parse() {
        for text in ["colour = \"blue\"", "analytics_mode = \"strict\""] {
            let err = GateConfig::from_toml_str(text, "inline").unwrap_err();
            assert!(matches!(err, ConfigError::ParseToml { .. }), "{text}");
        }
    }
}
