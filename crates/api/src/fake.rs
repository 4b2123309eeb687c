// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`ApiClient`] double for tests in this crate and downstream
//! crates (enabled via the `test-support` feature).

use crate::client::{ApiClient, CrackerUpdate};
use crate::error::ApiError;
use crate::types::{AgentMetadataUpdate, ConfigurationBody, ConfigurationResponse, SubmitErrorPayload};
use agent_core::{Attack, AttackId, BenchmarkRow, CrackedHash, Status, Task, TaskId};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Default)]
struct Inner {
    accepted_tasks: Vec<TaskId>,
    statuses: Vec<(TaskId, Status)>,
    cracks: Vec<(TaskId, CrackedHash)>,
    exhausted: Vec<TaskId>,
    abandoned: Vec<TaskId>,
    heartbeats: u32,
    benchmarks: Vec<Vec<BenchmarkRow>>,
    submitted_errors: Vec<SubmitErrorPayload>,
}

/// Scripted [`ApiClient`] double. Every RPC either succeeds with a
/// configured value or returns the configured failure; calls are recorded
/// for assertions.
pub struct FakeApiClient {
    base_url: Url,
    token: String,
    inner: Mutex<Inner>,
    next_task: Mutex<Option<Task>>,
    next_attack: Mutex<Option<Attack>>,
    heartbeat_revoked: bool,
    fail_accept_task: bool,
    fail_submit_error: bool,
    fail_heartbeat: bool,
    fail_submit_benchmark: bool,
}

impl Default for FakeApiClient {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://fake.test/").expect("static url parses"),
            token: "fake-token".to_string(),
            inner: Mutex::new(Inner::default()),
            next_task: Mutex::new(None),
            next_attack: Mutex::new(None),
            heartbeat_revoked: false,
            fail_accept_task: false,
            fail_submit_error: false,
            fail_heartbeat: false,
            fail_submit_benchmark: false,
        }
    }
}

impl FakeApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_next_task(self, task: Task) -> Self {
        *self.next_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
        self
    }

    pub fn with_next_attack(self, attack: Attack) -> Self {
        *self.next_attack.lock().unwrap_or_else(|e| e.into_inner()) = Some(attack);
        self
    }

    pub fn failing_accept_task(mut self) -> Self {
        self.fail_accept_task = true;
        self
    }

    pub fn failing_submit_error(mut self) -> Self {
        self.fail_submit_error = true;
        self
    }

    pub fn failing_heartbeat(mut self) -> Self {
        self.fail_heartbeat = true;
        self
    }

    pub fn failing_submit_benchmark(mut self) -> Self {
        self.fail_submit_benchmark = true;
        self
    }

    pub fn revoking_heartbeat(mut self) -> Self {
        self.heartbeat_revoked = true;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn accepted_tasks(&self) -> Vec<TaskId> {
        self.lock().accepted_tasks.clone()
    }

    pub fn statuses(&self) -> Vec<(TaskId, Status)> {
        self.lock().statuses.clone()
    }

    pub fn cracks(&self) -> Vec<(TaskId, CrackedHash)> {
        self.lock().cracks.clone()
    }

    pub fn exhausted(&self) -> Vec<TaskId> {
        self.lock().exhausted.clone()
    }

    pub fn abandoned(&self) -> Vec<TaskId> {
        self.lock().abandoned.clone()
    }

    pub fn heartbeat_count(&self) -> u32 {
        self.lock().heartbeats
    }

    pub fn benchmark_submissions(&self) -> Vec<Vec<BenchmarkRow>> {
        self.lock().benchmarks.clone()
    }

    pub fn submitted_errors(&self) -> Vec<SubmitErrorPayload> {
        self.lock().submitted_errors.clone()
    }
}

#[async_trait]
impl ApiClient for FakeApiClient {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn token(&self) -> &str {
        &self.token
    }

    async fn authenticate(&self, _cancel: &CancellationToken) -> Result<u64, ApiError> {
        Ok(1)
    }

    async fn get_configuration(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<ConfigurationResponse, ApiError> {
        Ok(ConfigurationResponse {
            api_version: 1,
            config: ConfigurationBody {
                use_native_hashcat: false,
                agent_update_interval: 30,
                backend_device: String::new(),
                opencl_devices: String::new(),
            },
        })
    }

    async fn get_new_task(&self, _cancel: &CancellationToken) -> Result<Option<Task>, ApiError> {
        Ok(self.next_task.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn get_attack(
        &self,
        _cancel: &CancellationToken,
        _attack_id: AttackId,
    ) -> Result<Attack, ApiError> {
        self.next_attack
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| ApiError::http(404, "no fake attack configured", None))
    }

    async fn download_hash_list(
        &self,
        _cancel: &CancellationToken,
        _attack_id: AttackId,
        dest: &Path,
    ) -> Result<(), ApiError> {
        tokio::fs::write(dest, b"fakehash:fakesalt\n").await?;
        Ok(())
    }

    async fn download_resource(
        &self,
        _cancel: &CancellationToken,
        _url: &str,
        _checksum: Option<&str>,
        dest: &Path,
    ) -> Result<(), ApiError> {
        tokio::fs::write(dest, b"fake resource contents\n").await?;
        Ok(())
    }

    async fn accept_task(
        &self,
        _cancel: &CancellationToken,
        task_id: TaskId,
    ) -> Result<bool, ApiError> {
        if self.fail_accept_task {
            return Err(ApiError::http(422, "already accepted", None));
        }
        self.lock().accepted_tasks.push(task_id);
        Ok(true)
    }

    async fn submit_status(
        &self,
        _cancel: &CancellationToken,
        task_id: TaskId,
        status: &Status,
        _now_unix: i64,
    ) -> Result<(), ApiError> {
        self.lock().statuses.push((task_id, status.clone()));
        Ok(())
    }

    async fn submit_crack(
        &self,
        _cancel: &CancellationToken,
        task_id: TaskId,
        cracked: &CrackedHash,
    ) -> Result<(), ApiError> {
        self.lock().cracks.push((task_id, cracked.clone()));
        Ok(())
    }

    async fn mark_task_exhausted(
        &self,
        _cancel: &CancellationToken,
        task_id: TaskId,
    ) -> Result<(), ApiError> {
        self.lock().exhausted.push(task_id);
        Ok(())
    }

    async fn set_task_abandoned(
        &self,
        _cancel: &CancellationToken,
        task_id: TaskId,
    ) -> Result<(), ApiError> {
        self.lock().abandoned.push(task_id);
        Ok(())
    }

    async fn heartbeat(
        &self,
        _cancel: &CancellationToken,
        _agent_id: u64,
    ) -> Result<bool, ApiError> {
        if self.fail_heartbeat {
            return Err(ApiError::http(500, "unavailable", None));
        }
        self.lock().heartbeats += 1;
        Ok(!self.heartbeat_revoked)
    }

    async fn update_agent_metadata(
        &self,
        _cancel: &CancellationToken,
        _agent_id: u64,
        _metadata: &AgentMetadataUpdate,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn submit_benchmark(
        &self,
        _cancel: &CancellationToken,
        _agent_id: u64,
        rows: &[BenchmarkRow],
    ) -> Result<(), ApiError> {
        if self.fail_submit_benchmark {
            return Err(ApiError::http(500, "benchmark ingest down", None));
        }
        self.lock().benchmarks.push(rows.to_vec());
        Ok(())
    }

    async fn submit_error(
        &self,
        _cancel: &CancellationToken,
        _agent_id: u64,
        report: &SubmitErrorPayload,
    ) -> Result<(), ApiError> {
        if self.fail_submit_error {
            return Err(ApiError::http(500, "reporter backend down", None));
        }
        self.lock().submitted_errors.push(report.clone());
        Ok(())
    }

    async fn shutdown(&self, _cancel: &CancellationToken, _agent_id: u64) -> Result<(), ApiError> {
        Ok(())
    }

    async fn check_for_cracker_update(
        &self,
        _cancel: &CancellationToken,
        _os: &str,
        _version: &str,
    ) -> Result<Option<CrackerUpdate>, ApiError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_accepted_tasks() {
        let fake = FakeApiClient::new();
        let cancel = CancellationToken::new();
        let accepted = fake.accept_task(&cancel, TaskId::new(1)).await.unwrap();
        assert!(accepted);
        assert_eq!(fake.accepted_tasks(), vec![TaskId::new(1)]);
    }

    #[tokio::test]
    async fn revoking_heartbeat_returns_false() {
        let fake = FakeApiClient::new().revoking_heartbeat();
        let cancel = CancellationToken::new();
        let ok = fake.heartbeat(&cancel, 1).await.unwrap();
        assert!(!ok);
    }
}
