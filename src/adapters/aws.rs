//! AWS implementations of the service traits.
//!
//! All three clients are built from one shared SDK configuration loaded for
//! the configured region.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sdk_codebuild::types::SortOrderType;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use super::{BuildService, LogService, ObjectStore, ServiceError};

/// Load the shared SDK configuration (credentials chain, retries) for `region`
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// The three AWS-backed collaborators, constructed together
pub struct AwsServices {
    pub builds: CodeBuildService,
    pub logs: CloudWatchLogService,
    pub storage: S3ObjectStore,
}

impl AwsServices {
    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self {
            builds: CodeBuildService::new(aws_sdk_codebuild::Client::new(config)),
            logs: CloudWatchLogService::new(aws_sdk_cloudwatchlogs::Client::new(config)),
            storage: S3ObjectStore::new(
                aws_sdk_s3::Client::new(config),
                config.credentials_provider(),
            ),
        }
    }

    pub async fn for_region(region: &str) -> Self {
        Self::from_sdk_config(&load_sdk_config(region).await)
    }
}

/// CodeBuild build history
pub struct CodeBuildService {
    client: aws_sdk_codebuild::Client,
}

impl CodeBuildService {
    pub fn new(client: aws_sdk_codebuild::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BuildService for CodeBuildService {
    async fn latest_build_ids(&self, project: &str) -> Result<Vec<String>, ServiceError> {
        let output = self
            .client
            .list_builds_for_project()
            .project_name(project)
            .sort_order(SortOrderType::Descending)
            .send()
            .await
            .map_err(|e| {
                ServiceError::BuildQuery(aws_sdk_codebuild::error::DisplayErrorContext(&e).to_string())
            })?;

        Ok(output.ids().to_vec())
    }
}

/// CloudWatch Logs stream reader
pub struct CloudWatchLogService {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogService {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogService for CloudWatchLogService {
    async fn fetch_messages(&self, group: &str, stream: &str) -> Result<Vec<String>, ServiceError> {
        let mut messages = Vec::new();
        let mut token: Option<String> = None;

        // The forward token repeats once the end of the stream is reached
        loop {
            let output = self
                .client
                .get_log_events()
                .log_group_name(group)
                .log_stream_name(stream)
                .start_from_head(true)
                .set_next_token(token.clone())
                .send()
                .await
                .map_err(|e| {
                    ServiceError::LogQuery(
                        aws_sdk_cloudwatchlogs::error::DisplayErrorContext(&e).to_string(),
                    )
                })?;

            messages.extend(
                output
                    .events()
                    .iter()
                    .filter_map(|event| event.message().map(str::to_string)),
            );

            match output.next_forward_token() {
                Some(next) if token.as_deref() != Some(next) => token = Some(next.to_string()),
                _ => break,
            }
        }

        debug!(group, stream, count = messages.len(), "Fetched log events");
        Ok(messages)
    }
}

/// S3 uploads and presigned downloads
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    credentials: Option<SharedCredentialsProvider>,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, credentials: Option<SharedCredentialsProvider>) -> Self {
        Self { client, credentials }
    }

    /// Resolve credentials ahead of the upload; a missing or broken chain is
    /// reported as `Credentials`, not `Upload`
    async fn ensure_credentials(&self) -> Result<(), ServiceError> {
        let provider = self.credentials.as_ref().ok_or_else(|| {
            ServiceError::Credentials("no credentials provider configured".to_string())
        })?;

        provider
            .provide_credentials()
            .await
            .map(|_| ())
            .map_err(|e| {
                ServiceError::Credentials(aws_sdk_s3::error::DisplayErrorContext(&e).to_string())
            })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, path: &Path, bucket: &str, key: &str) -> Result<(), ServiceError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ServiceError::FileNotFound(path.display().to_string()));
        }
        self.ensure_credentials().await?;

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| ServiceError::Upload(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| ServiceError::Upload(aws_sdk_s3::error::DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    async fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, ServiceError> {
        let presigning = PresigningConfig::expires_in(ttl).map_err(|e| ServiceError::Presign(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| ServiceError::Presign(aws_sdk_s3::error::DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }
}
