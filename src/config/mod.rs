// src/config/mod.rs

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} = {value} is out of range ({range})")]
    OutOfRange {
        field: &'static str,
        value: String,
        range: &'static str,
    },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub planner: PlannerConfig,
    pub fallback: FallbackConfig,
    pub llm: LlmConfig,
    pub workspace: WorkspaceConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    pub use_llm: bool,
    pub max_actions_per_plan: usize,
    pub max_decomposition_depth: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            use_llm: true,
            max_actions_per_plan: 15,
            max_decomposition_depth: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnLlmFailure {
    #[default]
    Abort,
    Deterministic,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FallbackConfig {
    pub on_llm_failure: OnLlmFailure,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            temperature: 0.1,
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./workspace"),
        }
    }
}

impl AgentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            "planner.max_actions_per_plan",
            self.planner.max_actions_per_plan,
            (1..=100).contains(&self.planner.max_actions_per_plan),
            "1..=100",
        )?;
        check(
            "planner.max_decomposition_depth",
            self.planner.max_decomposition_depth,
            (1..=64).contains(&self.planner.max_decomposition_depth),
            "1..=64",
        )?;
        check(
            "llm.temperature",
            self.llm.temperature,
            (0.0..=2.0).contains(&self.llm.temperature),
            "0.0..=2.0",
        )?;
        check(
            "llm.timeout_secs",
            self.llm.timeout_secs,
            (5..=300).contains(&self.llm.timeout_secs),
            "5..=300",
        )
    }
}

fn check(
    field: &'static str,
    value: impl ToString,
    ok: bool,
    range: &'static str,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            range,
        })
    }
}
