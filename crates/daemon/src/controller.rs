// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AgentController` — the outer state machine (§4.H).

use crate::error::DaemonError;
use crate::{cracker_update, pid_file};
use agent_api::types::AgentMetadataUpdate;
use agent_api::{ApiClient, ErrorCategory, ErrorReporter};
use agent_core::{AgentConfiguration, AgentState, CurrentActivity};
use agent_platform::Platform;
use agent_runner::{download, BenchmarkManager, TaskRunner};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct AgentController {
    api: Arc<dyn ApiClient>,
    platform: Arc<dyn Platform>,
    state: Arc<AgentState>,
    reporter: Arc<ErrorReporter>,
    use_native_hashcat_cli: bool,
    cli_hashcat_path: Option<PathBuf>,
    force_benchmark_run: bool,
    config: RwLock<AgentConfiguration>,
    hashcat_binary: RwLock<PathBuf>,
    revoked: Arc<AtomicBool>,
}

impl AgentController {
    pub fn new(
        api: Arc<dyn ApiClient>,
        platform: Arc<dyn Platform>,
        state: Arc<AgentState>,
        reporter: Arc<ErrorReporter>,
        use_native_hashcat_cli: bool,
        cli_hashcat_path: Option<PathBuf>,
        force_benchmark_run: bool,
    ) -> Self {
        let fallback_binary = cli_hashcat_path.clone().unwrap_or_else(|| {
            state
                .paths
                .crackers_path
                .join("hashcat")
                .join(platform.default_hashcat_binary_name())
        });
        Self {
            api,
            platform,
            state,
            reporter,
            use_native_hashcat_cli,
            cli_hashcat_path,
            force_benchmark_run,
            config: RwLock::new(AgentConfiguration::default()),
            hashcat_binary: RwLock::new(fallback_binary),
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }

    fn agent_id(&self) -> u64 {
        self.state.agent_id().map(|id| id.get()).unwrap_or(0)
    }

    fn config(&self) -> AgentConfiguration {
        self.config.read().clone()
    }

    fn hashcat_binary(&self) -> PathBuf {
        self.hashcat_binary.read().clone()
    }

    /// §4.H startup steps 1-6. On success the agent is ready to enter
    /// [`Self::run`].
    pub async fn startup(&self, cancel: &CancellationToken) -> Result<(), DaemonError> {
        self.state.set_activity(CurrentActivity::Starting);

        // 1. PID liveness check (overwrites a stale file).
        pid_file::claim(&self.state.paths.pid_file)?;

        // 2. Authenticate.
        match self.api.authenticate(cancel).await {
            Ok(id) => self.state.set_agent_id(agent_core::AgentId::new(id)),
            Err(e) => {
                self.reporter
                    .report(
                        cancel,
                        0,
                        format!("authentication failed: {e}"),
                        None,
                        agent_core::Severity::Critical,
                        ErrorCategory::Auth,
                    )
                    .await;
                pid_file::release(&self.state.paths.pid_file);
                return Err(DaemonError::Unauthenticated(e.to_string()));
            }
        }

        // 3. GetConfiguration.
        self.refresh_configuration(cancel).await?;

        // 4. Create data dirs.
        for dir in self.state.paths.directories() {
            std::fs::create_dir_all(dir)?;
        }

        // 5. Cracker self-update, if offered.
        self.state.set_activity(CurrentActivity::Updating);
        self.maybe_update_cracker(cancel).await;

        // 6. UpdateBenchmarks.
        self.state.set_activity(CurrentActivity::Benchmarking);
        let manager = self.benchmark_manager();
        if let Err(e) = manager.update_benchmarks(cancel).await {
            warn!(error = %e, "initial benchmark run failed; will retry opportunistically");
        }

        self.state.set_activity(CurrentActivity::Waiting);
        Ok(())
    }

    /// §4.H main loop, until `cancel` fires or the agent is revoked.
    /// Takes `self` behind an `Arc` so the background heartbeat task can
    /// hold a clone across the `'static` bound `tokio::spawn` requires.
    pub async fn run(self: &Arc<Self>, cancel: CancellationToken) -> Result<(), DaemonError> {
        let heartbeat_task = self.spawn_heartbeat(cancel.clone());

        while !cancel.is_cancelled() && !self.revoked.load(Ordering::SeqCst) {
            if self.state.reload_requested() {
                if let Err(e) = self.refresh_configuration(&cancel).await {
                    warn!(error = %e, "config reload failed; keeping previous configuration");
                }
                self.state.clear_reload();
            }

            if !self.state.job_checking_stopped() {
                let manager = self.benchmark_manager();
                if manager.try_submit_cached_benchmarks(&cancel).await {
                    self.poll_and_run_task(&cancel).await;
                    continue;
                }
            }

            let interval = self.config().agent_update_interval;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        self.state.set_activity(CurrentActivity::Stopping);
        heartbeat_task.abort();
        pid_file::release(&self.state.paths.pid_file);
        let _ = self.api.shutdown(&cancel, self.agent_id()).await;
        Ok(())
    }

    async fn poll_and_run_task(&self, cancel: &CancellationToken) {
        let task = match self.api.get_new_task(cancel).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                let interval = self.config().agent_update_interval;
                tokio::time::sleep(interval).await;
                return;
            }
            Err(e) => {
                warn!(error = %e, "GetNewTask failed; retrying next iteration");
                return;
            }
        };

        match self.api.accept_task(cancel, task.id).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                self.reporter
                    .report(
                        cancel,
                        self.agent_id(),
                        format!("accept_task failed: {e}"),
                        Some(task.id),
                        agent_core::Severity::Info,
                        ErrorCategory::AcceptTask,
                    )
                    .await;
                return;
            }
        }

        let attack = match self.api.get_attack(cancel, task.attack_id).await {
            Ok(attack) => attack,
            Err(e) => {
                self.reporter
                    .report(
                        cancel,
                        self.agent_id(),
                        format!("get_attack failed: {e}"),
                        Some(task.id),
                        agent_core::Severity::Critical,
                        ErrorCategory::Generic,
                    )
                    .await;
                return;
            }
        };

        if let Err(e) = download::ensure_hash_list(
            self.api.as_ref(),
            cancel,
            &attack,
            &self.state.paths.hashlist_path,
        )
        .await
        {
            warn!(error = %e, task_id = %task.id, "hashlist download failed; abandoning task");
            return;
        }
        if let Err(e) = download::ensure_attack_resources(
            self.api.as_ref(),
            cancel,
            &attack,
            &self.state.paths.file_path,
        )
        .await
        {
            warn!(error = %e, task_id = %task.id, "resource download failed; abandoning task");
            return;
        }

        let config = self.config();
        let runner = TaskRunner::new(
            self.api.clone(),
            self.reporter.clone(),
            self.state.clone(),
            self.hashcat_binary(),
            self.platform.additional_hashcat_args(),
        )
        .with_devices(config.backend_devices.clone(), config.opencl_devices.clone());

        runner.run_task(cancel, task, Some(attack)).await;
        self.state.set_activity(CurrentActivity::Waiting);
    }

    async fn refresh_configuration(&self, cancel: &CancellationToken) -> Result<(), DaemonError> {
        let response = self.api.get_configuration(cancel).await?;
        let config = AgentConfiguration {
            use_native_hashcat: response.config.use_native_hashcat,
            agent_update_interval: std::time::Duration::from_secs(
                response.config.agent_update_interval,
            ),
            backend_devices: response.config.backend_device,
            opencl_devices: response.config.opencl_devices,
            api_version: response.api_version,
        };

        if (config.use_native_hashcat || self.use_native_hashcat_cli) && self.cli_hashcat_path.is_none() {
            let resolved = self
                .state
                .paths
                .crackers_path
                .join("hashcat")
                .join(self.platform.default_hashcat_binary_name());
            *self.hashcat_binary.write() = resolved;
        }

        *self.config.write() = config;
        Ok(())
    }

    async fn maybe_update_cracker(&self, cancel: &CancellationToken) {
        let host = self.platform.host_info();
        let current_version = self
            .platform
            .hashcat_version(&self.hashcat_binary())
            .await
            .unwrap_or_default();

        match self
            .api
            .check_for_cracker_update(cancel, &host.os, &current_version)
            .await
        {
            Ok(Some(update)) => {
                match cracker_update::apply(
                    self.api.as_ref(),
                    self.platform.as_ref(),
                    cancel,
                    &self.state.paths.crackers_path,
                    &update,
                )
                .await
                {
                    Ok(binary) => {
                        info!(version = %update.version, "cracker updated");
                        *self.hashcat_binary.write() = binary;
                    }
                    Err(e) => warn!(error = %e, "cracker update aborted; keeping existing install"),
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "check_for_cracker_update failed"),
        }
    }

    /// Runs the heartbeat on its own tick, independent of the poll loop
    /// (§4.H: "single cooperative thread, with a background heartbeat
    /// task"). A `410` flips `self.revoked`, which `run`'s loop condition
    /// observes on its next check.
    fn spawn_heartbeat(self: &Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(
                controller.config().agent_update_interval.max(std::time::Duration::from_secs(1)),
            );
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        match controller.api.heartbeat(&cancel, controller.agent_id()).await {
                            Ok(true) => {}
                            Ok(false) => {
                                info!("heartbeat revoked (410); initiating shutdown");
                                controller.revoked.store(true, Ordering::SeqCst);
                                break;
                            }
                            Err(e) => warn!(error = %e, "heartbeat failed; retrying next tick"),
                        }
                    }
                }
            }
        })
    }

    fn benchmark_manager(&self) -> BenchmarkManager {
        BenchmarkManager::new(
            self.api.clone(),
            self.state.clone(),
            self.hashcat_binary(),
            self.platform.additional_hashcat_args(),
            self.force_benchmark_run,
        )
    }

    /// §6 `PUT /agents/{id}` — pushed once after startup so the control
    /// plane's device inventory reflects this host. Not part of §4.H's
    /// numbered steps; best-effort, like device inventory itself.
    pub async fn publish_agent_metadata(&self, cancel: &CancellationToken) -> Result<(), DaemonError> {
        let host = self.platform.host_info();
        let devices = self.platform.device_inventory().await.unwrap_or_default();
        let metadata = AgentMetadataUpdate {
            hostname: host.hostname,
            client_signature: format!("{}-{}", host.os, host.kernel_arch),
            operating_system: host.os,
            devices,
        };
        self.api
            .update_agent_metadata(cancel, self.agent_id(), &metadata)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_api::fake::FakeApiClient;
    use agent_core::{Attack, AttackId, Task};
    use agent_platform::fake::FakePlatform;

    fn controller(dir: &std::path::Path, api: FakeApiClient) -> Arc<AgentController> {
        let state = Arc::new(AgentState::new("token", "https://example.test", dir));
        let api: Arc<dyn ApiClient> = Arc::new(api);
        let reporter = Arc::new(ErrorReporter::new(api.clone(), "linux".into(), "1.0.0".into()));
        Arc::new(AgentController::new(
            api,
            Arc::new(FakePlatform::new()),
            state,
            reporter,
            false,
            None,
            false,
        ))
    }

    #[tokio::test]
    async fn startup_claims_pid_and_caches_agent_id() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path(), FakeApiClient::new());
        let cancel = CancellationToken::new();
        controller.startup(&cancel).await.unwrap();

        assert!(dir.path().join("agent.pid").exists());
        assert_eq!(controller.state.agent_id().unwrap().get(), 1);
        assert_eq!(controller.state.activity(), CurrentActivity::Waiting);
    }

    #[tokio::test]
    async fn startup_fails_when_pid_already_live() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("agent.pid"), format!("{}\n", std::process::id())).unwrap();
        let controller = controller(dir.path(), FakeApiClient::new());
        let cancel = CancellationToken::new();
        assert!(matches!(
            controller.startup(&cancel).await,
            Err(DaemonError::AlreadyRunning(_))
        ));
    }

    #[tokio::test]
    async fn run_exits_promptly_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path(), FakeApiClient::new());
        let cancel = CancellationToken::new();
        controller.startup(&cancel).await.unwrap();

        cancel.cancel();
        controller.run(cancel).await.unwrap();
        assert_eq!(controller.state.activity(), CurrentActivity::Stopping);
        assert!(!dir.path().join("agent.pid").exists());
    }

    #[tokio::test]
    async fn run_stops_after_a_revoking_heartbeat() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeApiClient::new().revoking_heartbeat();
        let controller = controller(dir.path(), api);
        let cancel = CancellationToken::new();
        controller.startup(&cancel).await.unwrap();

        let run_result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            controller.run(cancel),
        )
        .await;
        assert!(run_result.is_ok());
    }

    #[tokio::test]
    async fn poll_and_run_task_accepts_and_runs_a_task() {
        let dir = tempfile::tempdir().unwrap();
        let task = Task {
            id: agent_core::TaskId::new(1),
            attack_id: AttackId::new(1),
            skip: None,
            limit: None,
        };
        let attack = Attack {
            id: AttackId::new(1),
            hash_mode: 0,
            attack_mode_hashcat: agent_core::AttackModeHashcat::Dictionary,
            hash_list_id: agent_core::id::HashListId::new(1),
            hash_list_url: "https://example.test/hash_list".into(),
            mask: None,
            increment_mode: false,
            increment_minimum: None,
            increment_maximum: None,
            custom_charset_1: None,
            custom_charset_2: None,
            custom_charset_3: None,
            custom_charset_4: None,
            word_list: None,
            rule_list: None,
            mask_list: None,
            optimized: false,
            slow_candidate_generators: false,
        };
        let api = FakeApiClient::new().with_next_task(task).with_next_attack(attack);
        let controller = controller(dir.path(), api);
        let cancel = CancellationToken::new();
        controller.startup(&cancel).await.unwrap();

        controller.poll_and_run_task(&cancel).await;
        assert_eq!(controller.state.activity(), CurrentActivity::Waiting);
    }
}
