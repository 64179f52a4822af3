use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    alignment::{AlignmentNode, Axis, SubtreeMode, build_tree, compose},
    completion::CompletionConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub completion: CompletionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub run: RunConfig,
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_file_prefix() -> String {
    "flipflop.log".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_output_path() -> PathBuf {
    PathBuf::from("flipflop.mmd")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            file_prefix: default_logging_file_prefix(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

/// What to synthesize: the seed topic and either a flat axis list or a split root whose
/// two halves are built from separate axis lists. `Config::load` accepts exactly one of
/// the two forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub topic: String,
    #[serde(default)]
    pub axes: Vec<Axis>,
    #[serde(default)]
    pub split: Option<SplitConfig>,
    #[serde(default = "default_output_path")]
    pub output: PathBuf,
    #[serde(default)]
    pub subtree_mode: SubtreeMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    pub axis: Axis,
    #[serde(default)]
    pub left: Vec<Axis>,
    #[serde(default)]
    pub right: Vec<Axis>,
}

impl RunConfig {
    /// Fresh tree with the topic seeded on the root.
    pub fn build_tree(&self) -> AlignmentNode {
        let root = match &self.split {
            Some(split) => compose(
                split.axis.clone(),
                build_tree(&split.left),
                build_tree(&split.right),
            ),
            None => build_tree(&self.axes),
        };
        root.with_payload(self.topic.clone())
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize config")?;

        match (config.run.axes.is_empty(), config.run.split.is_some()) {
            (true, false) => {
                return Err(anyhow!("run.axes must not be empty when run.split is absent"));
            }
            (false, true) => {
                return Err(anyhow!("run.axes and run.split are mutually exclusive"));
            }
            _ => {}
        }
        if !config.run.output.is_absolute() {
            config.run.output = config_base.join(&config.run.output);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join("flipflop.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or flipflop.schema.json next to it"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
