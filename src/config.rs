//! Configuration for the relay handlers.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (RELAY_SLACK_WEBHOOK_URL, RELAY_BUCKET, AWS_REGION, ...)
//! 2. Config file (RELAY_CONFIG, or .relay/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - RELAY_CONFIG names the file explicitly
//! - Otherwise searches current directory and parents for .relay/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<RelayConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub slack: SlackFileConfig,
    #[serde(default)]
    pub build_logs: BuildLogsFileConfig,
    #[serde(default)]
    pub subscription: SubscriptionFileConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackFileConfig {
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildLogsFileConfig {
    pub project_name: Option<String>,
    pub log_group: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub presign_ttl_seconds: Option<u64>,
    /// Scratch directory (relative to the config file's project root)
    pub scratch_dir: Option<String>,
    pub presign_with_local_path: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionFileConfig {
    pub default_build_id: Option<String>,
}

/// Resolved configuration, injected into each handler
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelayConfig {
    pub slack: SlackConfig,
    pub build_logs: BuildLogsConfig,
    pub subscription: SubscriptionConfig,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlackConfig {
    pub webhook_url: String,
    pub channel: String,
    /// Display name of the sender
    pub username: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: "https://hooks.slack.com/services/REPLACE/ME".to_string(),
            channel: "#code-pipeline-alerts".to_string(),
            username: "pipeline-relay".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildLogsConfig {
    /// CodeBuild project whose latest build is reported
    pub project_name: String,
    /// CloudWatch log group holding the build logs
    pub log_group: String,
    /// Bucket receiving the uploaded log files
    pub bucket: String,
    pub region: String,
    pub presign_ttl_seconds: u64,
    /// Where log files are written before upload
    pub scratch_dir: PathBuf,
    /// Sign the local file path as the object key. When false, sign the
    /// uploaded object's base name instead.
    pub presign_with_local_path: bool,
}

impl Default for BuildLogsConfig {
    fn default() -> Self {
        Self {
            project_name: "build-project".to_string(),
            log_group: "/aws/codebuild/build-project".to_string(),
            bucket: "build-logs".to_string(),
            region: "us-east-1".to_string(),
            presign_ttl_seconds: 3600, // 1 hour
            scratch_dir: std::env::temp_dir(),
            presign_with_local_path: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionConfig {
    /// Shown when no build id appears in the aggregated logs
    pub default_build_id: String,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            default_build_id: "Same as previous build".to_string(),
        }
    }
}

/// Find config file: RELAY_CONFIG, else search current directory and parents
fn find_config_file() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("RELAY_CONFIG") {
        return Some(PathBuf::from(explicit));
    }

    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".relay").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Merge a parsed config file over the defaults
fn apply_file(config: &mut RelayConfig, file: ConfigFile, base_dir: &Path) {
    let slack = &mut config.slack;
    if let Some(v) = file.slack.webhook_url {
        slack.webhook_url = v;
    }
    if let Some(v) = file.slack.channel {
        slack.channel = v;
    }
    if let Some(v) = file.slack.username {
        slack.username = v;
    }

    let build = &mut config.build_logs;
    if let Some(v) = file.build_logs.project_name {
        build.project_name = v;
    }
    if let Some(v) = file.build_logs.log_group {
        build.log_group = v;
    }
    if let Some(v) = file.build_logs.bucket {
        build.bucket = v;
    }
    if let Some(v) = file.build_logs.region {
        build.region = v;
    }
    if let Some(v) = file.build_logs.presign_ttl_seconds {
        build.presign_ttl_seconds = v;
    }
    if let Some(ref v) = file.build_logs.scratch_dir {
        build.scratch_dir = resolve_path(base_dir, v);
    }
    if let Some(v) = file.build_logs.presign_with_local_path {
        build.presign_with_local_path = v;
    }

    if let Some(v) = file.subscription.default_build_id {
        config.subscription.default_build_id = v;
    }
}

/// Apply environment overrides through `lookup` (std::env::var in production)
fn apply_env<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("RELAY_SLACK_WEBHOOK_URL") {
        config.slack.webhook_url = v;
    }
    if let Some(v) = lookup("RELAY_SLACK_CHANNEL") {
        config.slack.channel = v;
    }
    if let Some(v) = lookup("RELAY_SLACK_USERNAME") {
        config.slack.username = v;
    }
    if let Some(v) = lookup("RELAY_BUILD_PROJECT") {
        config.build_logs.project_name = v;
    }
    if let Some(v) = lookup("RELAY_LOG_GROUP") {
        config.build_logs.log_group = v;
    }
    if let Some(v) = lookup("RELAY_BUCKET") {
        config.build_logs.bucket = v;
    }
    if let Some(v) = lookup("AWS_REGION") {
        config.build_logs.region = v;
    }
    if let Some(v) = lookup("RELAY_SCRATCH_DIR") {
        config.build_logs.scratch_dir = PathBuf::from(v);
    }
}

/// Load configuration from all sources
fn load_config() -> Result<RelayConfig> {
    let mut config = RelayConfig::default();
    let config_file = find_config_file();

    if let Some(ref config_path) = config_file {
        let file = load_config_file(config_path)?;

        // Base directory is the parent of .relay/ (i.e., grandparent of config.yaml)
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));

        apply_file(&mut config, file, base_dir);
    }

    apply_env(&mut config, |key| std::env::var(key).ok());
    config.config_file = config_file;

    Ok(config)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static RelayConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<RelayConfig> {
    load_config()
}
