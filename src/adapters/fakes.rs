//! In-memory fakes for the adapter traits (testing only)
//!
//! Each fake records the calls it receives so tests can assert both on the
//! outcome and on which services were touched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{BuildService, ChatSink, DeliveryError, LogService, ObjectStore, ServiceError};
use crate::domain::ChatMessage;

// ---------------------------------------------------------------------------
// RecordingChatSink
// ---------------------------------------------------------------------------

/// Chat sink that keeps every message it is asked to post.
#[derive(Debug, Default)]
pub struct RecordingChatSink {
    messages: Mutex<Vec<ChatMessage>>,
    attempts: Mutex<usize>,
    failure: Option<DeliveryError>,
}

impl RecordingChatSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every post fails with a copy of `error`
    pub fn failing(error: DeliveryError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Messages accepted so far
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Posts attempted, including failed ones
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl ChatSink for RecordingChatSink {
    async fn post(&self, message: &ChatMessage) -> Result<(), DeliveryError> {
        *self.attempts.lock().unwrap() += 1;
        match &self.failure {
            Some(DeliveryError::Status { code, reason }) => Err(DeliveryError::Status {
                code: *code,
                reason: reason.clone(),
            }),
            Some(DeliveryError::Transport(reason)) => Err(DeliveryError::Transport(reason.clone())),
            None => {
                self.messages.lock().unwrap().push(message.clone());
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryBuildService
// ---------------------------------------------------------------------------

/// Build service backed by a fixed, already sorted list of ids.
#[derive(Debug, Default)]
pub struct MemoryBuildService {
    result: Option<Result<Vec<String>, ServiceError>>,
    queries: Mutex<Vec<String>>,
}

impl MemoryBuildService {
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            result: Some(Ok(ids.into_iter().map(Into::into).collect())),
            queries: Mutex::default(),
        }
    }

    pub fn failing(error: ServiceError) -> Self {
        Self {
            result: Some(Err(error)),
            queries: Mutex::default(),
        }
    }

    /// Project names queried so far
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildService for MemoryBuildService {
    async fn latest_build_ids(&self, project: &str) -> Result<Vec<String>, ServiceError> {
        self.queries.lock().unwrap().push(project.to_string());
        self.result.clone().unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ---------------------------------------------------------------------------
// MemoryLogService
// ---------------------------------------------------------------------------

/// Log service backed by a `HashMap<(group, stream), messages>`.
#[derive(Debug, Default)]
pub struct MemoryLogService {
    streams: HashMap<(String, String), Vec<String>>,
    failure: Option<ServiceError>,
    queries: Mutex<Vec<(String, String)>>,
}

impl MemoryLogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream<I, S>(mut self, group: &str, stream: &str, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.streams.insert(
            (group.to_string(), stream.to_string()),
            messages.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn failing(error: ServiceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// `(group, stream)` pairs queried so far
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogService for MemoryLogService {
    async fn fetch_messages(&self, group: &str, stream: &str) -> Result<Vec<String>, ServiceError> {
        self.queries
            .lock()
            .unwrap()
            .push((group.to_string(), stream.to_string()));

        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        self.streams
            .get(&(group.to_string(), stream.to_string()))
            .cloned()
            .ok_or_else(|| ServiceError::LogQuery(format!("stream not found: {group}/{stream}")))
    }
}

// ---------------------------------------------------------------------------
// MemoryObjectStore
// ---------------------------------------------------------------------------

/// Object store that reads uploaded files into a `HashMap<(bucket, key), bytes>`.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    uploads: Mutex<Vec<PathBuf>>,
    presigned: Mutex<Vec<(String, String, Duration)>>,
    upload_failure: Option<ServiceError>,
    presign_failure: Option<ServiceError>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_upload(error: ServiceError) -> Self {
        Self {
            upload_failure: Some(error),
            ..Self::default()
        }
    }

    pub fn failing_presign(error: ServiceError) -> Self {
        Self {
            presign_failure: Some(error),
            ..Self::default()
        }
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Local paths passed to `upload`
    pub fn uploads(&self) -> Vec<PathBuf> {
        self.uploads.lock().unwrap().clone()
    }

    /// `(bucket, key, ttl)` of every presign request
    pub fn presign_requests(&self) -> Vec<(String, String, Duration)> {
        self.presigned.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, path: &Path, bucket: &str, key: &str) -> Result<(), ServiceError> {
        self.uploads.lock().unwrap().push(path.to_path_buf());

        if let Some(err) = &self.upload_failure {
            return Err(err.clone());
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|_| ServiceError::FileNotFound(path.display().to_string()))?;

        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }

    async fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, ServiceError> {
        self.presigned
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), ttl));

        if let Some(err) = &self.presign_failure {
            return Err(err.clone());
        }

        Ok(format!(
            "https://{bucket}.s3.amazonaws.com/{key}?X-Amz-Expires={}",
            ttl.as_secs()
        ))
    }
}
