use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{DagflowError, Result};

/// Engine configuration, usually loaded from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// default options applied to every run
    pub run: RunConfig,
    /// http node settings
    pub http: HttpConfig,
    /// variable interpolation settings
    pub template: TemplateConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// keep going after a node fails
    pub continue_on_error: bool,
    /// per-node deadline in milliseconds
    pub node_timeout_ms: Option<u64>,
    /// whole-run deadline in milliseconds
    pub run_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// fixed delay between http retry attempts, in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TemplateConfig {
    pub unresolved: UnresolvedPolicy,
}

/// What the resolver does with a `{path}` token it cannot resolve.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Leave the literal token in the output.
    #[default]
    Leave,
    /// Fail the node that asked for the resolution.
    Fail,
}

/// Options for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub continue_on_error: bool,
    pub node_timeout: Option<Duration>,
    pub run_timeout: Option<Duration>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn continue_on_error(
        mut self,
        yes: bool,
    ) -> Self {
        self.continue_on_error = yes;
        self
    }

    pub fn node_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    pub fn run_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.run_timeout = Some(timeout);
        self
    }
}

impl From<&RunConfig> for RunOptions {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            continue_on_error: cfg.continue_on_error,
            node_timeout: cfg.node_timeout_ms.map(Duration::from_millis),
            run_timeout: cfg.run_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| DagflowError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        Ok(config)
    }

    /// Run options derived from the `[run]` table.
    pub fn run_options(&self) -> RunOptions {
        RunOptions::from(&self.run)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::{Config, UnresolvedPolicy};

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
        [run]
        continue_on_error = true
        node_timeout_ms = 2500

        [http]
        retry_delay_ms = 50

        [template]
        unresolved = "fail"
        "#;
        let config = Config::load_from_str(toml_str).unwrap();
        assert!(config.run.continue_on_error);
        assert_eq!(config.http.retry_delay_ms, 50);
        assert_eq!(config.template.unresolved, UnresolvedPolicy::Fail);

        let opts = config.run_options();
        assert_eq!(opts.node_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(opts.run_timeout, None);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::load_from_str("").unwrap();
        assert!(!config.run.continue_on_error);
        assert_eq!(config.http.retry_delay_ms, 1000);
        assert_eq!(config.template.unresolved, UnresolvedPolicy::Leave);
    }

    #[test]
    fn test_config_rejects_bad_policy() {
        let err = Config::load_from_str("[template]\nunresolved = \"explode\"").unwrap_err();
        assert!(matches!(err, crate::DagflowError::Config(_)));
    }

    #[test]
    fn test_config_missing_file() {
        assert!(Config::create("/definitely/not/here.toml").is_err());
    }
}
