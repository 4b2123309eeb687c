// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `TaskRunner` — drives one hashcat session end to end (§4.F).

use agent_api::{ApiClient, ErrorCategory, ErrorReporter};
use agent_core::{
    AgentState, Attack, CrackedHash, CurrentActivity, Params, Severity, Status, Task, TaskId,
};
use agent_session::{DoneOutcome, SessionOutputs, SessionSupervisor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How the run ended, beyond the session's own exit classification — set
/// when a status submission told us the server no longer wants this task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerTermination {
    None,
    /// 404 on `submit_status`: the task was deleted server-side.
    Deleted,
    /// 410 on `submit_status`: the task was revoked; the agent should treat
    /// this as end-of-task and let the controller move on.
    Revoked,
    /// The root cancellation token fired (SIGINT/SIGTERM). The session was
    /// killed; the controller is already shutting down so nothing further
    /// is reported upstream.
    Cancelled,
}

/// Runs one task's hashcat session, fanning in its five output channels
/// and translating them into the wire protocol (§4.F, §5).
pub struct TaskRunner {
    api: Arc<dyn ApiClient>,
    reporter: Arc<ErrorReporter>,
    state: Arc<AgentState>,
    hashcat_binary: PathBuf,
    platform_extra_args: Vec<String>,
    backend_devices: String,
    opencl_devices: String,
}

/// Bounded grace period the fan-in loop waits, after the session itself has
/// exited, for the outfile tailer to emit any cracked hashes that were
/// flushed to disk right before exit but not yet polled. The tailer isn't
/// gated by `DoneChan` (§5) — only `Cleanup` stops it.
const TRAILING_CRACK_DRAIN: Duration = Duration::from_millis(500);

impl TaskRunner {
    pub fn new(
        api: Arc<dyn ApiClient>,
        reporter: Arc<ErrorReporter>,
        state: Arc<AgentState>,
        hashcat_binary: PathBuf,
        platform_extra_args: Vec<String>,
    ) -> Self {
        Self {
            api,
            reporter,
            state,
            hashcat_binary,
            platform_extra_args,
            backend_devices: String::new(),
            opencl_devices: String::new(),
        }
    }

    /// Apply `backend_devices`/`opencl_devices` from the agent's current
    /// configuration to every session this runner starts from now on.
    pub fn with_devices(mut self, backend_devices: String, opencl_devices: String) -> Self {
        self.backend_devices = backend_devices;
        self.opencl_devices = opencl_devices;
        self
    }

    fn agent_id(&self) -> u64 {
        self.state.agent_id().map(|id| id.get()).unwrap_or(0)
    }

    /// Run `task` against `attack` to completion. Never returns an `Err`
    /// for task-level failures — those are reported upstream and logged;
    /// this only surfaces errors in starting the session itself.
    pub async fn run_task(&self, cancel: &CancellationToken, task: Task, attack: Option<Attack>) {
        tracing::info!(task_id = %task.id, "starting task run");
        self.state.set_activity(CurrentActivity::Cracking);

        let Some(attack) = attack else {
            self.reporter
                .report(
                    cancel,
                    self.agent_id(),
                    "RunTask invoked with no attack",
                    Some(task.id),
                    Severity::Critical,
                    ErrorCategory::Generic,
                )
                .await;
            self.state.set_activity(CurrentActivity::Waiting);
            return;
        };

        let params = Params::for_task(
            &attack,
            &task,
            &self.state.paths.hashlist_path,
            &self.state.paths.restore_file_path,
            &self.state.paths.out_path,
        )
        .with_backend_devices(self.backend_devices.clone())
        .with_opencl_devices(self.opencl_devices.clone());

        let supervisor = SessionSupervisor::new(
            self.hashcat_binary.clone(),
            &params,
            &self.platform_extra_args,
        );

        let outputs = match supervisor.start().await {
            Ok(outputs) => outputs,
            Err(e) => {
                self.reporter
                    .report(
                        cancel,
                        self.agent_id(),
                        format!("failed to start session: {e}"),
                        Some(task.id),
                        Severity::Critical,
                        ErrorCategory::Generic,
                    )
                    .await;
                self.state.set_activity(CurrentActivity::Waiting);
                return;
            }
        };

        let (outcome, termination) = self.fan_in(cancel, task.id, &supervisor, outputs).await;
        self.finish(cancel, task.id, outcome, termination).await;
        supervisor.cleanup();
        self.state.set_activity(CurrentActivity::Waiting);
    }

    /// Single-reader fan-in over the session's five channels (§5). Returns
    /// once `DoneChan` fires, having drained any cracked hashes the tailer
    /// had already queued.
    async fn fan_in(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
        supervisor: &SessionSupervisor,
        outputs: SessionOutputs,
    ) -> (DoneOutcome, ServerTermination) {
        let SessionOutputs {
            mut stdout_lines,
            mut stderr_messages,
            mut status_updates,
            mut cracked_hashes,
            done,
        } = outputs;
        tokio::pin!(done);

        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut status_open = true;
        let mut termination = ServerTermination::None;
        let mut cancel_handled = false;

        let outcome = loop {
            tokio::select! {
                biased;

                result = &mut done => {
                    break result.unwrap_or_else(|_| {
                        DoneOutcome::SpawnFailed("done channel dropped unexpectedly".to_string())
                    });
                }

                _ = cancel.cancelled(), if !cancel_handled => {
                    cancel_handled = true;
                    tracing::info!(task_id = %task_id, "cancellation requested; killing session");
                    termination = ServerTermination::Cancelled;
                    supervisor.kill();
                }

                line = stdout_lines.recv(), if stdout_open => {
                    match line {
                        Some(line) => {
                            if let Some(status) = Status::parse_line(&line) {
                                self.send_status(cancel, supervisor, task_id, &status, &mut termination).await;
                            }
                        }
                        None => stdout_open = false,
                    }
                }

                line = stderr_messages.recv(), if stderr_open => {
                    match line {
                        Some(line) => {
                            tracing::warn!(task_id = %task_id, %line, "hashcat stderr");
                            if !line.trim().is_empty() {
                                self.reporter
                                    .report(cancel, self.agent_id(), line, Some(task_id), Severity::Minor, ErrorCategory::Generic)
                                    .await;
                            }
                        }
                        None => stderr_open = false,
                    }
                }

                status = status_updates.recv(), if status_open => {
                    match status {
                        Some(status) => {
                            tracing::debug!(task_id = %task_id, progress = ?status.progress, "status update");
                            self.send_status(cancel, supervisor, task_id, &status, &mut termination).await;
                        }
                        None => status_open = false,
                    }
                }

                cracked = cracked_hashes.recv() => {
                    if let Some(cracked) = cracked {
                        self.send_crack(cancel, task_id, &cracked).await;
                    }
                }
            }
        };

        while let Ok(Some(cracked)) =
            tokio::time::timeout(TRAILING_CRACK_DRAIN, cracked_hashes.recv()).await
        {
            self.send_crack(cancel, task_id, &cracked).await;
        }

        (outcome, termination)
    }

    /// Translate a `Status` to the wire payload and submit it, applying the
    /// response-code policy (§4.F). A 404/410 kills the supervisor and
    /// records the termination reason for the caller to act on once
    /// `DoneChan` fires.
    async fn send_status(
        &self,
        cancel: &CancellationToken,
        supervisor: &SessionSupervisor,
        task_id: TaskId,
        status: &Status,
        termination: &mut ServerTermination,
    ) {
        if *termination != ServerTermination::None {
            return;
        }
        let now_unix = chrono_now_unix();
        match self.api.submit_status(cancel, task_id, status, now_unix).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::info!(task_id = %task_id, "task deleted server-side; stopping session");
                *termination = ServerTermination::Deleted;
                supervisor.kill();
            }
            Err(e) if e.is_gone() => {
                tracing::info!(task_id = %task_id, "task revoked server-side; pausing session");
                *termination = ServerTermination::Revoked;
                supervisor.kill();
            }
            Err(e) => {
                self.reporter
                    .report(
                        cancel,
                        self.agent_id(),
                        format!("submit_status failed: {e}"),
                        Some(task_id),
                        Severity::Warning,
                        ErrorCategory::SubmitStatus,
                    )
                    .await;
            }
        }
    }

    async fn send_crack(&self, cancel: &CancellationToken, task_id: TaskId, cracked: &CrackedHash) {
        tracing::info!(task_id = %task_id, hash = %cracked.hash, "cracked hash recovered");
        if let Err(e) = self.api.submit_crack(cancel, task_id, cracked).await {
            let severity = if e.is_client_error() {
                Severity::Major
            } else {
                Severity::Minor
            };
            self.reporter
                .report(
                    cancel,
                    self.agent_id(),
                    format!("submit_crack failed: {e}"),
                    Some(task_id),
                    severity,
                    ErrorCategory::SubmitCrack,
                )
                .await;
        }
    }

    /// Act on the session's final outcome (§4.F step 5's `DoneChan`
    /// branches). A server-initiated termination (404/410) always takes
    /// priority: the exit code in that case just reflects the kill, not a
    /// real completion or failure.
    async fn finish(
        &self,
        cancel: &CancellationToken,
        task_id: TaskId,
        outcome: DoneOutcome,
        termination: ServerTermination,
    ) {
        match termination {
            ServerTermination::Deleted => {
                tracing::info!(task_id = %task_id, "session stopped: task deleted");
                return;
            }
            ServerTermination::Revoked => {
                tracing::info!(task_id = %task_id, "session stopped: task revoked");
                return;
            }
            ServerTermination::Cancelled => {
                tracing::info!(task_id = %task_id, "session stopped: cancelled");
                return;
            }
            ServerTermination::None => {}
        }

        match outcome {
            DoneOutcome::Exited { code, message, stale_restore } => {
                if stale_restore {
                    tracing::info!(task_id = %task_id, "stale restore file detected and removed; task not failed");
                    return;
                }
                match code {
                    Some(1) => {
                        tracing::info!(task_id = %task_id, "job session exhausted");
                        if let Err(e) = self.api.mark_task_exhausted(cancel, task_id).await {
                            self.reporter
                                .report(
                                    cancel,
                                    self.agent_id(),
                                    format!("mark_task_exhausted failed: {e}"),
                                    Some(task_id),
                                    Severity::Warning,
                                    ErrorCategory::Generic,
                                )
                                .await;
                        }
                    }
                    Some(0) => {
                        tracing::info!(task_id = %task_id, "session exited cleanly");
                    }
                    _ => {
                        self.reporter
                            .report(
                                cancel,
                                self.agent_id(),
                                format!("session ended abnormally: {message}"),
                                Some(task_id),
                                Severity::Critical,
                                ErrorCategory::Generic,
                            )
                            .await;
                        self.abandon(cancel, task_id).await;
                    }
                }
            }
            DoneOutcome::SpawnFailed(message) => {
                self.reporter
                    .report(
                        cancel,
                        self.agent_id(),
                        format!("session failed to start: {message}"),
                        Some(task_id),
                        Severity::Critical,
                        ErrorCategory::Generic,
                    )
                    .await;
                self.abandon(cancel, task_id).await;
            }
        }
    }

    async fn abandon(&self, cancel: &CancellationToken, task_id: TaskId) {
        if let Err(e) = self.api.set_task_abandoned(cancel, task_id).await {
            if let agent_api::ApiError::SetTaskAbandoned { details, error } = &e {
                self.reporter
                    .report_set_task_abandoned(cancel, self.agent_id(), task_id, details, error.as_deref())
                    .await;
            } else {
                self.reporter
                    .report(
                        cancel,
                        self.agent_id(),
                        format!("set_task_abandoned failed: {e}"),
                        Some(task_id),
                        Severity::Warning,
                        ErrorCategory::Generic,
                    )
                    .await;
            }
        }
    }
}

fn chrono_now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_api::fake::FakeApiClient;
    use agent_core::id::{AttackId, HashListId};

    fn runner_with(fake: Arc<FakeApiClient>, dir: &std::path::Path) -> TaskRunner {
        let reporter = Arc::new(ErrorReporter::new(fake.clone(), "linux".into(), "1.0.0".into()));
        let state = Arc::new(AgentState::new("token", "https://example.test", dir));
        state.set_agent_id(agent_core::AgentId::new(1));
        TaskRunner::new(fake, reporter, state, PathBuf::from("true"), Vec::new())
    }

    fn sample_attack() -> Attack {
        Attack {
            id: AttackId::new(5),
            hash_mode: 0,
            attack_mode_hashcat: agent_core::AttackModeHashcat::Dictionary,
            hash_list_id: HashListId::new(9),
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
        }
    }

    fn sample_task() -> Task {
        Task {
            id: agent_core::id::TaskId::new(1),
            attack_id: AttackId::new(5),
            skip: None,
            limit: None,
        }
    }

    #[tokio::test]
    async fn missing_attack_reports_critical_and_returns() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeApiClient::new());
        let runner = runner_with(fake.clone(), dir.path());
        let cancel = CancellationToken::new();
        runner.run_task(&cancel, sample_task(), None).await;
        let errors = fake.submitted_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, "critical");
    }

    #[tokio::test]
    async fn clean_exit_submits_no_exhausted_or_abandoned() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeApiClient::new());
        let runner = runner_with(fake.clone(), dir.path());
        let cancel = CancellationToken::new();
        runner.run_task(&cancel, sample_task(), Some(sample_attack())).await;
        assert!(fake.exhausted().is_empty());
        assert!(fake.abandoned().is_empty());
    }

    #[tokio::test]
    async fn exit_code_one_marks_task_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeApiClient::new());
        let reporter = Arc::new(ErrorReporter::new(fake.clone(), "linux".into(), "1.0.0".into()));
        let state = Arc::new(AgentState::new("token", "https://example.test", dir.path()));
        state.set_agent_id(agent_core::AgentId::new(1));
        let runner = TaskRunner::new(fake.clone(), reporter, state, PathBuf::from("false"), Vec::new());
        let cancel = CancellationToken::new();
        runner.run_task(&cancel, sample_task(), Some(sample_attack())).await;
        assert_eq!(fake.exhausted(), vec![agent_core::id::TaskId::new(1)]);
        assert!(fake.abandoned().is_empty());
    }

    /// Mid-task cancellation (§4.H item 6 / §9): firing the root token
    /// while a session is running must kill the child promptly rather than
    /// waiting for it to exit on its own, and must not report the task as
    /// exhausted or abandoned.
    #[tokio::test]
    async fn cancellation_kills_the_session_promptly() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("long_running.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let fake = Arc::new(FakeApiClient::new());
        let reporter = Arc::new(ErrorReporter::new(fake.clone(), "linux".into(), "1.0.0".into()));
        let state = Arc::new(AgentState::new("token", "https://example.test", dir.path()));
        state.set_agent_id(agent_core::AgentId::new(1));
        let runner = TaskRunner::new(fake.clone(), reporter, state, script, Vec::new());

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            cancel_clone.cancel();
        });

        let started = std::time::Instant::now();
        tokio::time::timeout(
            Duration::from_secs(5),
            runner.run_task(&cancel, sample_task(), Some(sample_attack())),
        )
        .await
        .expect("run_task must return promptly once cancelled, not after the child's own 30s sleep");

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(fake.exhausted().is_empty());
        assert!(fake.abandoned().is_empty());
    }
}
