// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BenchmarkManager` — at-most-once benchmark delivery (§4.G).

use crate::error::RunnerError;
use agent_api::ApiClient;
use agent_core::{AgentState, BenchmarkRow, Params};
use agent_session::{DoneOutcome, SessionSupervisor};
use agent_storage::BenchmarkCache;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct BenchmarkManager {
    api: Arc<dyn ApiClient>,
    state: Arc<AgentState>,
    cache: BenchmarkCache,
    hashcat_binary: PathBuf,
    platform_extra_args: Vec<String>,
    force_benchmark_run: bool,
}

impl BenchmarkManager {
    pub fn new(
        api: Arc<dyn ApiClient>,
        state: Arc<AgentState>,
        hashcat_binary: PathBuf,
        platform_extra_args: Vec<String>,
        force_benchmark_run: bool,
    ) -> Self {
        let cache = BenchmarkCache::new(state.paths.benchmark_cache_path.clone());
        Self {
            api,
            state,
            cache,
            hashcat_binary,
            platform_extra_args,
            force_benchmark_run,
        }
    }

    fn agent_id(&self) -> u64 {
        self.state.agent_id().map(|id| id.get()).unwrap_or(0)
    }

    /// Run the full §4.G algorithm: try the cache first (unless a forced
    /// re-run was requested), falling back to an actual benchmark session.
    pub async fn update_benchmarks(&self, cancel: &CancellationToken) -> Result<(), RunnerError> {
        self.state.set_benchmarks_submitted(false);

        if !self.force_benchmark_run {
            if let Some(rows) = self.cache.load() {
                return self.submit_loaded_rows(cancel, rows).await;
            }
        }

        self.run_benchmark_session(cancel).await
    }

    /// Submission-only phase, called by the controller before each poll.
    /// Returns whether the agent is ready to crack (benchmarks submitted).
    pub async fn try_submit_cached_benchmarks(&self, cancel: &CancellationToken) -> bool {
        if self.state.benchmarks_submitted() {
            return true;
        }
        let Some(rows) = self.cache.load() else {
            return false;
        };
        matches!(self.submit_loaded_rows(cancel, rows).await, Ok(()))
            && self.state.benchmarks_submitted()
    }

    /// Send the unsubmitted subset of `rows`; on success, mark everything
    /// submitted, clear the cache, and flip `BenchmarksSubmitted`. Wire
    /// failures are logged and retried on a later call — never propagated.
    async fn submit_loaded_rows(
        &self,
        cancel: &CancellationToken,
        rows: Vec<BenchmarkRow>,
    ) -> Result<(), RunnerError> {
        let unsubmitted: Vec<BenchmarkRow> =
            rows.into_iter().filter(|r| !r.submitted).collect();
        if unsubmitted.is_empty() {
            self.state.set_benchmarks_submitted(true);
            self.cache.clear()?;
            return Ok(());
        }

        match self.api.submit_benchmark(cancel, self.agent_id(), &unsubmitted).await {
            Ok(()) => {
                self.state.set_benchmarks_submitted(true);
                self.cache.clear()?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "submit_benchmark failed; will retry from cache");
                Ok(())
            }
        }
    }

    /// Run an actual `--benchmark --machine-readable` session, parse its
    /// stdout, and try to deliver the result.
    async fn run_benchmark_session(&self, cancel: &CancellationToken) -> Result<(), RunnerError> {
        let params = benchmark_params(&self.state);
        let supervisor =
            SessionSupervisor::new(self.hashcat_binary.clone(), &params, &self.platform_extra_args);
        let mut outputs = supervisor.start().await?;

        let mut rows = Vec::new();
        let mut done = false;
        while !done {
            tokio::select! {
                biased;
                outcome = &mut outputs.done => {
                    done = true;
                    if let Ok(DoneOutcome::SpawnFailed(message)) = outcome {
                        tracing::warn!(%message, "benchmark session failed to start");
                    }
                }
                line = outputs.stdout_lines.recv() => {
                    match line {
                        Some(line) => {
                            if let Some(row) = BenchmarkRow::parse_line(&line) {
                                rows.push(row);
                            } else {
                                tracing::debug!(%line, "ignoring non-benchmark stdout line");
                            }
                        }
                        None => {}
                    }
                }
                line = outputs.stderr_messages.recv() => {
                    if let Some(line) = line {
                        tracing::debug!(%line, "benchmark session stderr");
                    }
                }
            }
        }
        supervisor.cleanup();

        if rows.is_empty() {
            return Ok(());
        }

        let save_result = self.cache.save(&rows).await;
        let send_result = self.api.submit_benchmark(cancel, self.agent_id(), &rows).await;

        match (save_result, send_result) {
            (Ok(()), Ok(())) => {
                self.state.set_benchmarks_submitted(true);
                self.cache.clear()?;
                Ok(())
            }
            (Ok(()), Err(e)) => {
                tracing::warn!(error = %e, "submit_benchmark failed after a successful save; will retry");
                Ok(())
            }
            (Err(save_err), Ok(())) => {
                // Delivered but couldn't persist — nothing to retry from,
                // but the server has the data, so this isn't a failure.
                tracing::warn!(error = %save_err, "benchmark cache save failed after a successful submit");
                self.state.set_benchmarks_submitted(true);
                Ok(())
            }
            (Err(save_err), Err(send_err)) => {
                tracing::error!(%save_err, %send_err, "benchmark save and submit both failed; no way to retry");
                Err(RunnerError::Cache(save_err))
            }
        }
    }
}

/// `Params` for a benchmark run: no wordlist, mask, or target hash file —
/// hashcat's `--benchmark` mode ignores them.
fn benchmark_params(state: &AgentState) -> Params {
    Params {
        attack_id: agent_core::id::AttackId::new(0),
        hash_mode: 0,
        attack_mode: agent_core::AttackModeHashcat::Dictionary,
        hash_file: PathBuf::new(),
        word_list: None,
        rule_list: None,
        mask_list: None,
        mask: None,
        mask_increment: false,
        increment_minimum: 0,
        increment_maximum: 0,
        custom_charset_1: None,
        custom_charset_2: None,
        custom_charset_3: None,
        custom_charset_4: None,
        optimized_kernels: false,
        slow_candidates: false,
        skip: 0,
        limit: 0,
        backend_devices: None,
        opencl_devices: None,
        additional_args: Vec::new(),
        attack_benchmark: true,
        status_timer: std::time::Duration::from_secs(agent_core::params::DEFAULT_STATUS_TIMER_SECS),
        restore_file: state.paths.restore_file_path.join("benchmark.restore"),
        out_file: state.paths.out_path.join("benchmark.out"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_api::fake::FakeApiClient;

    fn manager(fake: Arc<FakeApiClient>, dir: &std::path::Path, force: bool) -> BenchmarkManager {
        let state = Arc::new(AgentState::new("token", "https://example.test", dir));
        state.set_agent_id(agent_core::AgentId::new(1));
        BenchmarkManager::new(fake, state, PathBuf::from("true"), Vec::new(), force)
    }

    fn sample_rows(submitted: bool) -> Vec<BenchmarkRow> {
        vec![BenchmarkRow {
            device: "1".into(),
            hash_type: "0".into(),
            runtime_ms: "100".into(),
            hash_time_ms: "50".into(),
            speed_hs: "12345.67".into(),
            submitted,
        }]
    }

    #[tokio::test]
    async fn cached_unsubmitted_rows_are_sent_and_cache_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeApiClient::new());
        let mgr = manager(fake.clone(), dir.path(), false);
        mgr.cache.save(&sample_rows(false)).await.unwrap();

        let cancel = CancellationToken::new();
        mgr.update_benchmarks(&cancel).await.unwrap();

        assert_eq!(fake.benchmark_submissions().len(), 1);
        assert!(mgr.cache.load().is_none());
        assert!(mgr.state.benchmarks_submitted());
    }

    #[tokio::test]
    async fn already_submitted_rows_are_cleared_without_resending() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeApiClient::new());
        let mgr = manager(fake.clone(), dir.path(), false);
        mgr.cache.save(&sample_rows(true)).await.unwrap();

        let cancel = CancellationToken::new();
        mgr.update_benchmarks(&cancel).await.unwrap();

        assert!(fake.benchmark_submissions().is_empty());
        assert!(mgr.cache.load().is_none());
        assert!(mgr.state.benchmarks_submitted());
    }

    #[tokio::test]
    async fn try_submit_cached_benchmarks_reports_readiness() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeApiClient::new());
        let mgr = manager(fake.clone(), dir.path(), false);

        let cancel = CancellationToken::new();
        assert!(!mgr.try_submit_cached_benchmarks(&cancel).await);

        mgr.cache.save(&sample_rows(false)).await.unwrap();
        assert!(mgr.try_submit_cached_benchmarks(&cancel).await);
    }

    #[tokio::test]
    async fn empty_cache_falls_through_to_a_benchmark_session() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeApiClient::new());
        let mgr = manager(fake.clone(), dir.path(), false);
        let cancel = CancellationToken::new();
        // `true` as the hashcat binary prints nothing, so no rows are
        // parsed and the session is a no-op success.
        mgr.update_benchmarks(&cancel).await.unwrap();
        assert!(fake.benchmark_submissions().is_empty());
    }

    /// A script standing in for hashcat that emits one machine-readable
    /// benchmark line regardless of the `--benchmark` flags it's invoked
    /// with, so `run_benchmark_session` always has a row to parse.
    fn benchmark_stub_script(dir: &std::path::Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("hashcat_stub.sh");
        std::fs::write(&script, "#!/bin/sh\necho '1:0:ignored:100:50:12345.67'\n").unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();
        script
    }

    /// S5 / Testable Property #5: a `submit_benchmark` failure right after
    /// a successful cache `save` must leave the cache file exactly as the
    /// save left it, so a later retry can still find the row.
    #[tokio::test]
    async fn submit_failure_after_successful_save_preserves_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let script = benchmark_stub_script(dir.path());
        let fake = Arc::new(FakeApiClient::new().failing_submit_benchmark());
        let state = Arc::new(AgentState::new("token", "https://example.test", dir.path()));
        state.set_agent_id(agent_core::AgentId::new(1));
        let mgr = BenchmarkManager::new(fake.clone(), state, script, Vec::new(), true);

        let cancel = CancellationToken::new();
        mgr.update_benchmarks(&cancel).await.unwrap();

        assert!(fake.benchmark_submissions().is_empty());
        assert!(!mgr.state.benchmarks_submitted());
        let cached = mgr.cache.load().expect("failed submit must not clear the cache");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].speed_hs, "12345.67");

        let before = std::fs::read(&mgr.state.paths.benchmark_cache_path).unwrap();
        let after = std::fs::read(&mgr.state.paths.benchmark_cache_path).unwrap();
        assert_eq!(before, after);
    }
}
