//! HTTP client for the remote index service.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::BackendConfig;

use super::api::{
    IncrementalUpdateRequest, IncrementalUpdateResponse, InitializeRequest, InitializeResponse,
    ProjectSnapshot, ProjectStatus,
};
use super::error::{RemoteError, RemoteResult};

/// The remote index service, seen through its five operations.
///
/// The indexer and updater depend on this trait rather than on a
/// concrete HTTP client so tests can substitute an in-memory backend.
#[async_trait]
pub trait RemoteIndex: Send + Sync {
    /// Bulk-create (or replace) a project with every file's symbols.
    async fn initialize_project(&self, req: &InitializeRequest)
    -> RemoteResult<InitializeResponse>;

    /// Apply a versioned incremental update. A stale version yields
    /// `RemoteError::Conflict`.
    async fn incremental_update(
        &self,
        project_id: &str,
        req: &IncrementalUpdateRequest,
    ) -> RemoteResult<IncrementalUpdateResponse>;

    /// Lightweight existence/version probe.
    async fn project_status(&self, project_id: &str) -> RemoteResult<ProjectStatus>;

    /// Fetch the authoritative full snapshot.
    async fn fetch_snapshot(&self, project_id: &str) -> RemoteResult<ProjectSnapshot>;

    /// Delete a project. Callers treat `NotFound` as already-deleted.
    async fn delete_project(&self, project_id: &str) -> RemoteResult<()>;

    /// Service health probe.
    async fn health(&self) -> RemoteResult<()>;
}

/// `RemoteIndex` implementation over reqwest.
#[derive(Debug, Clone)]
pub struct RemoteIndexClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl RemoteIndexClient {
    pub fn new(config: &BackendConfig) -> RemoteResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Connection {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn map_transport(&self, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout {
                seconds: self.timeout_secs,
            }
        } else if e.is_connect() {
            RemoteError::Connection {
                reason: e.to_string(),
            }
        } else {
            RemoteError::Http {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                body: e.to_string(),
            }
        }
    }

    /// Classify a non-2xx response into the error taxonomy.
    async fn classify(&self, response: reqwest::Response) -> RemoteError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::CONFLICT => RemoteError::Conflict { message: body },
            StatusCode::NOT_FOUND => RemoteError::NotFound,
            _ => RemoteError::Http {
                status: status.as_u16(),
                body,
            },
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> RemoteResult<T> {
        if !response.status().is_success() {
            return Err(self.classify(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::InvalidResponse {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl RemoteIndex for RemoteIndexClient {
    async fn initialize_project(
        &self,
        req: &InitializeRequest,
    ) -> RemoteResult<InitializeResponse> {
        let response = self
            .http
            .post(self.url("/context/projects/initialize"))
            .json(req)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.read_json(response).await
    }

    async fn incremental_update(
        &self,
        project_id: &str,
        req: &IncrementalUpdateRequest,
    ) -> RemoteResult<IncrementalUpdateResponse> {
        let response = self
            .http
            .patch(self.url(&format!("/context/projects/{project_id}/incremental")))
            .json(req)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.read_json(response).await
    }

    async fn project_status(&self, project_id: &str) -> RemoteResult<ProjectStatus> {
        let response = self
            .http
            .get(self.url(&format!("/context/projects/{project_id}/status")))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.read_json(response).await
    }

    async fn fetch_snapshot(&self, project_id: &str) -> RemoteResult<ProjectSnapshot> {
        let response = self
            .http
            .get(self.url(&format!("/context/projects/{project_id}")))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.read_json(response).await
    }

    async fn delete_project(&self, project_id: &str) -> RemoteResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/context/projects/{project_id}")))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.classify(response).await)
        }
    }

    async fn health(&self) -> RemoteResult<()> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.classify(response).await)
        }
    }
}
