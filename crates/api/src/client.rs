// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed, cancellable RPCs against the control plane (§4.B, §6).

use crate::error::ApiError;
use crate::types::{
    AgentMetadataUpdate, AuthenticateResponse, BenchmarkRowPayload, ConfigurationResponse,
    CrackerUpdateResponse, SetTaskAbandonedErrorBody, SubmitCrackPayload, SubmitErrorPayload,
    TaskStatusPayload,
};
use agent_core::{Attack, AttackId, BenchmarkRow, CrackedHash, Status, Task, TaskId};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Resolved server-side answer to "is there an update?" (§6
/// `check_for_cracker_update`).
#[derive(Debug, Clone)]
pub struct CrackerUpdate {
    pub version: String,
    pub download_url: String,
    pub exec_name: String,
}

/// Typed, context-aware RPCs against `<Url>/api/v1/client` (§4.B). Every
/// method accepts a [`CancellationToken`] and must abort promptly when it
/// fires — the controller propagates a single root token to every
/// suspension point (§5).
#[async_trait]
pub trait ApiClient: Send + Sync {
    fn base_url(&self) -> &Url;
    fn token(&self) -> &str;

    async fn authenticate(&self, cancel: &CancellationToken) -> Result<u64, ApiError>;

    async fn get_configuration(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ConfigurationResponse, ApiError>;

    /// `None` on `204` (no task available).
    async fn get_new_task(&self, cancel: &CancellationToken) -> Result<Option<Task>, ApiError>;

    async fn get_attack(
        &self,
        cancel: &CancellationToken,
        attack_id: AttackId,
    ) -> Result<Attack, ApiError>;

    /// Stream the hashlist for `attack_id` to `dest`, overwriting it.
    async fn download_hash_list(
        &self,
        cancel: &CancellationToken,
        attack_id: AttackId,
        dest: &Path,
    ) -> Result<(), ApiError>;

    /// Stream an arbitrary resource (wordlist/rulelist/masklist/archive) URL
    /// to `dest`, appending `?checksum=` when `checksum` is supplied.
    async fn download_resource(
        &self,
        cancel: &CancellationToken,
        url: &str,
        checksum: Option<&str>,
        dest: &Path,
    ) -> Result<(), ApiError>;

    /// `Ok(true)` on `204`, `Ok(false)` on `422` (already accepted/done).
    async fn accept_task(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
    ) -> Result<bool, ApiError>;

    async fn submit_status(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
        status: &Status,
        now_unix: i64,
    ) -> Result<(), ApiError>;

    async fn submit_crack(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
        cracked: &CrackedHash,
    ) -> Result<(), ApiError>;

    async fn mark_task_exhausted(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
    ) -> Result<(), ApiError>;

    async fn set_task_abandoned(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
    ) -> Result<(), ApiError>;

    /// `Ok(true)` on `204` (continue), `Ok(false)` on `410` (agent revoked).
    async fn heartbeat(&self, cancel: &CancellationToken, agent_id: u64) -> Result<bool, ApiError>;

    async fn update_agent_metadata(
        &self,
        cancel: &CancellationToken,
        agent_id: u64,
        metadata: &AgentMetadataUpdate,
    ) -> Result<(), ApiError>;

    async fn submit_benchmark(
        &self,
        cancel: &CancellationToken,
        agent_id: u64,
        rows: &[BenchmarkRow],
    ) -> Result<(), ApiError>;

    async fn submit_error(
        &self,
        cancel: &CancellationToken,
        agent_id: u64,
        report: &SubmitErrorPayload,
    ) -> Result<(), ApiError>;

    async fn shutdown(&self, cancel: &CancellationToken, agent_id: u64) -> Result<(), ApiError>;

    /// `None` on `204` (no update available).
    async fn check_for_cracker_update(
        &self,
        cancel: &CancellationToken,
        os: &str,
        version: &str,
    ) -> Result<Option<CrackerUpdate>, ApiError>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Production [`ApiClient`] backed by `reqwest`.
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpApiClient {
    pub fn new(base_url: Url, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    fn endpoint(&self, path: &str) -> Url {
        self.base_url
            .join(&format!("api/v1/client/{}", path.trim_start_matches('/')))
            .unwrap_or_else(|_| self.base_url.clone())
    }

    async fn run<F, Fut, T>(&self, cancel: &CancellationToken, fut_fn: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ApiError>>,
    {
        tokio::select! {
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = fut_fn() => result,
        }
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() == 204 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.ok();
            return Err(ApiError::http(status.as_u16(), status.to_string(), body));
        }
        let value = response.json::<T>().await?;
        Ok(Some(value))
    }

    async fn send_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() || status.as_u16() == 204 {
            return Ok(());
        }
        let body = response.text().await.ok();
        Err(ApiError::http(status.as_u16(), status.to_string(), body))
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn token(&self) -> &str {
        &self.token
    }

    async fn authenticate(&self, cancel: &CancellationToken) -> Result<u64, ApiError> {
        self.run(cancel, || async {
            let request = self.http.post(self.endpoint("authenticate").as_str());
            let body: AuthenticateResponse = self
                .send_json(request)
                .await?
                .ok_or_else(|| ApiError::http(204, "unexpected empty authenticate body", None))?;
            Ok(body.agent_id)
        })
        .await
    }

    async fn get_configuration(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ConfigurationResponse, ApiError> {
        self.run(cancel, || async {
            let request = self.http.get(self.endpoint("configuration").as_str());
            self.send_json(request)
                .await?
                .ok_or_else(|| ApiError::http(204, "unexpected empty configuration body", None))
        })
        .await
    }

    async fn get_new_task(&self, cancel: &CancellationToken) -> Result<Option<Task>, ApiError> {
        self.run(cancel, || async {
            let request = self.http.get(self.endpoint("tasks/new").as_str());
            self.send_json(request).await
        })
        .await
    }

    async fn get_attack(
        &self,
        cancel: &CancellationToken,
        attack_id: AttackId,
    ) -> Result<Attack, ApiError> {
        self.run(cancel, || async {
            let request = self
                .http
                .get(self.endpoint(&format!("attacks/{attack_id}")).as_str());
            self.send_json(request)
                .await?
                .ok_or_else(|| ApiError::http(204, "unexpected empty attack body", None))
        })
        .await
    }

    async fn download_hash_list(
        &self,
        cancel: &CancellationToken,
        attack_id: AttackId,
        dest: &Path,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("attacks/{attack_id}/hash_list"));
        self.stream_to_file(cancel, url, dest).await
    }

    async fn download_resource(
        &self,
        cancel: &CancellationToken,
        url: &str,
        checksum: Option<&str>,
        dest: &Path,
    ) -> Result<(), ApiError> {
        let mut parsed = Url::parse(url).map_err(|e| {
            ApiError::http(0, format!("invalid resource url {url}: {e}"), None)
        })?;
        if let Some(checksum) = checksum {
            parsed.query_pairs_mut().append_pair("checksum", checksum);
        }
        self.stream_to_file(cancel, parsed, dest).await
    }

    async fn accept_task(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
    ) -> Result<bool, ApiError> {
        self.run(cancel, || async {
            let request = self
                .http
                .post(self.endpoint(&format!("tasks/{task_id}/accept_task")).as_str());
            match self.send_empty(request).await {
                Ok(()) => Ok(true),
                Err(e) if e.is_unprocessable() => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn submit_status(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
        status: &Status,
        now_unix: i64,
    ) -> Result<(), ApiError> {
        let payload = TaskStatusPayload::from_status(status, now_unix);
        self.run(cancel, || async {
            let request = self
                .http
                .post(self.endpoint(&format!("tasks/{task_id}/submit_status")).as_str())
                .json(&payload);
            self.send_empty(request).await
        })
        .await
    }

    async fn submit_crack(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
        cracked: &CrackedHash,
    ) -> Result<(), ApiError> {
        let payload = SubmitCrackPayload {
            timestamp: cracked.timestamp.to_rfc3339(),
            hash: cracked.hash.clone(),
            plaintext: cracked.plaintext.clone(),
        };
        self.run(cancel, || async {
            let request = self
                .http
                .post(self.endpoint(&format!("tasks/{task_id}/submit_crack")).as_str())
                .json(&payload);
            self.send_empty(request).await
        })
        .await
    }

    async fn mark_task_exhausted(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
    ) -> Result<(), ApiError> {
        self.run(cancel, || async {
            let request = self
                .http
                .post(self.endpoint(&format!("tasks/{task_id}/exhausted")).as_str());
            self.send_empty(request).await
        })
        .await
    }

    async fn set_task_abandoned(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
    ) -> Result<(), ApiError> {
        self.run(cancel, || async {
            let request = self
                .http
                .post(self.endpoint(&format!("tasks/{task_id}/set_abandoned")).as_str());
            let response = request
                .bearer_auth(&self.token)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await?;
            let status = response.status();
            if status.is_success() || status.as_u16() == 204 {
                return Ok(());
            }
            if let Ok(body) = response.json::<SetTaskAbandonedErrorBody>().await {
                return Err(ApiError::SetTaskAbandoned {
                    details: body.details,
                    error: body.error,
                });
            }
            Err(ApiError::http(status.as_u16(), status.to_string(), None))
        })
        .await
    }

    async fn heartbeat(&self, cancel: &CancellationToken, agent_id: u64) -> Result<bool, ApiError> {
        self.run(cancel, || async {
            let request = self
                .http
                .post(self.endpoint(&format!("agents/{agent_id}/heartbeat")).as_str());
            match self.send_empty(request).await {
                Ok(()) => Ok(true),
                Err(e) if e.is_gone() => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn update_agent_metadata(
        &self,
        cancel: &CancellationToken,
        agent_id: u64,
        metadata: &AgentMetadataUpdate,
    ) -> Result<(), ApiError> {
        self.run(cancel, || async {
            let request = self
                .http
                .put(self.endpoint(&format!("agents/{agent_id}")).as_str())
                .json(metadata);
            self.send_empty(request).await
        })
        .await
    }

    async fn submit_benchmark(
        &self,
        cancel: &CancellationToken,
        agent_id: u64,
        rows: &[BenchmarkRow],
    ) -> Result<(), ApiError> {
        let payload: Vec<BenchmarkRowPayload> = rows
            .iter()
            .map(|r| BenchmarkRowPayload {
                device: r.device.clone(),
                hash_type: r.hash_type.clone(),
                runtime: r.runtime_ms.clone(),
                hash_time: r.hash_time_ms.clone(),
                speed: r.speed_hs.clone(),
            })
            .collect();
        self.run(cancel, || async {
            let request = self
                .http
                .post(self.endpoint(&format!("agents/{agent_id}/submit_benchmark")).as_str())
                .json(&payload);
            self.send_empty(request).await
        })
        .await
    }

    async fn submit_error(
        &self,
        cancel: &CancellationToken,
        agent_id: u64,
        report: &SubmitErrorPayload,
    ) -> Result<(), ApiError> {
        self.run(cancel, || async {
            let request = self
                .http
                .post(self.endpoint(&format!("agents/{agent_id}/submit_error")).as_str())
                .json(report);
            self.send_empty(request).await
        })
        .await
    }

    async fn shutdown(&self, cancel: &CancellationToken, agent_id: u64) -> Result<(), ApiError> {
        self.run(cancel, || async {
            let request = self
                .http
                .post(self.endpoint(&format!("agents/{agent_id}/shutdown")).as_str());
            self.send_empty(request).await
        })
        .await
    }

    async fn check_for_cracker_update(
        &self,
        cancel: &CancellationToken,
        os: &str,
        version: &str,
    ) -> Result<Option<CrackerUpdate>, ApiError> {
        self.run(cancel, || async {
            let url = self
                .endpoint("crackers/check_for_cracker_update")
                .as_str()
                .to_string();
            let request = self
                .http
                .get(&url)
                .query(&[("os", os), ("version", version)]);
            let body: Option<CrackerUpdateResponse> = self.send_json(request).await?;
            Ok(body.and_then(|b| {
                if !b.available {
                    return None;
                }
                Some(CrackerUpdate {
                    version: b.version?,
                    download_url: b.download_url?,
                    exec_name: b.exec_name.unwrap_or_default(),
                })
            }))
        })
        .await
    }
}

impl HttpApiClient {
    async fn stream_to_file(
        &self,
        cancel: &CancellationToken,
        url: Url,
        dest: &Path,
    ) -> Result<(), ApiError> {
        use tokio::io::AsyncWriteExt;

        self.run(cancel, || async {
            let response = self
                .http
                .get(url.as_str())
                .bearer_auth(&self.token)
                .timeout(DOWNLOAD_TIMEOUT)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.ok();
                return Err(ApiError::http(status.as_u16(), status.to_string(), body));
            }

            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut tmp_name = dest.as_os_str().to_os_string();
            tmp_name.push(".tmp");
            let tmp_path = std::path::PathBuf::from(tmp_name);
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, dest).await?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_relative_path() {
        let client = HttpApiClient::new(
            Url::parse("https://example.test/").unwrap(),
            "tok".to_string(),
        );
        assert_eq!(
            client.endpoint("tasks/new").as_str(),
            "https://example.test/api/v1/client/tasks/new"
        );
    }
}
