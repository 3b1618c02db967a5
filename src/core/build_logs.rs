//! Build log relay.
//!
//! Sends the pipeline status line, then for terminal states looks up the
//! latest build, copies its log stream to object storage and posts a second
//! message with a time-limited download link.
//!
//! The enrichment steps run strictly in order and the first failure ends the
//! branch. The status message sent first is never retracted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::notifier::{PipelineNotifier, EVENT_PROCESSED};
use super::Handler;
use crate::adapters::{deliver, BuildService, ChatSink, LogService, ObjectStore, ServiceError};
use crate::config::{BuildLogsConfig, SlackConfig};
use crate::domain::{BuildId, ChatMessage, HandlerResponse, StatusEvent};

/// Reasons the log link branch stopped early
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("No builds found for project {project}")]
    NoBuilds { project: String },

    #[error("Build id has no log stream part: {0}")]
    MalformedBuildId(BuildId),

    #[error("Failed to write log file {path}: {source}")]
    ScratchWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log file missing after write: {0}")]
    MissingFile(PathBuf),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl EnrichmentError {
    /// Nothing to report rather than something broken
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NoBuilds { .. } | Self::MalformedBuildId(_))
    }
}

/// Result of a completed enrichment branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedLog {
    pub build_id: BuildId,
    pub local_path: PathBuf,
    pub key: String,
    pub url: String,
}

/// Status notifier that also links the latest build's log file
pub struct BuildLogRelay {
    notifier: PipelineNotifier,
    slack: SlackConfig,
    settings: BuildLogsConfig,
    sink: Arc<dyn ChatSink>,
    builds: Arc<dyn BuildService>,
    logs: Arc<dyn LogService>,
    storage: Arc<dyn ObjectStore>,
}

impl BuildLogRelay {
    pub fn new(
        slack: SlackConfig,
        settings: BuildLogsConfig,
        sink: Arc<dyn ChatSink>,
        builds: Arc<dyn BuildService>,
        logs: Arc<dyn LogService>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            notifier: PipelineNotifier::new(slack.clone(), sink.clone()),
            slack,
            settings,
            sink,
            builds,
            logs,
            storage,
        }
    }

    /// Most recent build of the configured project
    async fn latest_build(&self) -> Result<BuildId, EnrichmentError> {
        let project = &self.settings.project_name;
        let ids = self.builds.latest_build_ids(project).await?;

        ids.into_iter()
            .next()
            .map(BuildId::new)
            .ok_or_else(|| EnrichmentError::NoBuilds {
                project: project.clone(),
            })
    }

    /// Write the log lines to `{scratch_dir}/{build_id}.log`
    async fn write_log_file(&self, build_id: &BuildId, messages: &[String]) -> Result<PathBuf, EnrichmentError> {
        let dir = &self.settings.scratch_dir;
        let path = dir.join(format!("{}.log", build_id));

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| EnrichmentError::ScratchWrite {
                path: path.clone(),
                source,
            })?;
        tokio::fs::write(&path, messages.join("\n"))
            .await
            .map_err(|source| EnrichmentError::ScratchWrite {
                path: path.clone(),
                source,
            })?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(EnrichmentError::MissingFile(path));
        }

        debug!(path = %path.display(), lines = messages.len(), "Wrote build log");
        Ok(path)
    }

    /// Fetch, store and sign the latest build's log
    pub async fn upload_latest_log(&self) -> Result<UploadedLog, EnrichmentError> {
        let build_id = self.latest_build().await?;
        info!(%build_id, "Latest build");

        let stream = build_id
            .log_stream()
            .ok_or_else(|| EnrichmentError::MalformedBuildId(build_id.clone()))?;

        let messages = self.logs.fetch_messages(&self.settings.log_group, stream).await?;
        let local_path = self.write_log_file(&build_id, &messages).await?;

        let key = object_key(&local_path);
        let bucket = &self.settings.bucket;
        self.storage.upload(&local_path, bucket, &key).await?;
        info!(bucket = %bucket, key = %key, "Uploaded build log");

        let signed_key = if self.settings.presign_with_local_path {
            local_path.display().to_string()
        } else {
            key.clone()
        };
        let ttl = Duration::from_secs(self.settings.presign_ttl_seconds);
        let url = self.storage.presign_get(bucket, &signed_key, ttl).await?;

        Ok(UploadedLog {
            build_id,
            local_path,
            key,
            url,
        })
    }

    /// Status text followed by the download link
    pub fn link_message(&self, event: &StatusEvent, url: &str) -> ChatMessage {
        ChatMessage::text(
            &self.slack.channel,
            &self.slack.username,
            format!("{}\nLog file URL: {}", event.status_text(), url),
        )
    }
}

/// Object key for an uploaded file: its base name
fn object_key(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[async_trait]
impl Handler for BuildLogRelay {
    fn name(&self) -> &str {
        "build-logs"
    }

    #[instrument(skip(self, event))]
    async fn handle(&self, event: Value) -> HandlerResponse {
        info!("Event: {}", event);

        let status = StatusEvent::from_value(&event);
        self.notifier.notify(&status).await;

        if !status.is_terminal() {
            return HandlerResponse::ok(EVENT_PROCESSED);
        }

        match self.upload_latest_log().await {
            Ok(uploaded) => {
                deliver(self.sink.as_ref(), &self.link_message(&status, &uploaded.url)).await;
            }
            Err(e) if e.is_benign() => warn!("{}", e),
            Err(e) => error!("Skipping log link: {}", e),
        }

        HandlerResponse::ok(EVENT_PROCESSED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_is_base_name() {
        assert_eq!(
            object_key(Path::new("/tmp/backend:1234.log")),
            "backend:1234.log"
        );
    }

    #[test]
    fn test_benign_errors() {
        assert!(EnrichmentError::NoBuilds {
            project: "p".to_string()
        }
        .is_benign());
        assert!(EnrichmentError::MalformedBuildId(BuildId::new("x")).is_benign());
        assert!(!EnrichmentError::Service(ServiceError::Upload("denied".to_string())).is_benign());
    }
}
