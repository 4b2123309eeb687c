// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SessionSupervisor` — one cracker child process per task (§4.E).

use crate::command::build_args;
use crate::error::SessionError;
use crate::pump::pump_lines;
use agent_core::{CrackedHash, Params, Status};
use std::path::PathBuf;
use std::process::Stdio;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// `Created → Started → Running → (Exited | Killed) → CleanedUp` (§4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Started,
    Running,
    Exited,
    Killed,
    CleanedUp,
}

/// How the child process ended.
#[derive(Debug, Clone)]
pub enum DoneOutcome {
    /// The child exited (possibly via a signal, in which case `code` is
    /// `None`). `message` reproduces the exit text verbatim for §7's
    /// "exit status 1" matching.
    Exited {
        code: Option<i32>,
        message: String,
        /// Set when stderr contained `Cannot read <restore file>` — the
        /// supervisor has already deleted the restore file.
        stale_restore: bool,
    },
    /// The child never started.
    SpawnFailed(String),
}

/// The five independent output channels a [`SessionSupervisor`] produces,
/// consumed by a single fan-in reader (§4.F).
pub struct SessionOutputs {
    pub stdout_lines: mpsc::UnboundedReceiver<String>,
    pub stderr_messages: mpsc::UnboundedReceiver<String>,
    pub status_updates: mpsc::UnboundedReceiver<Status>,
    pub cracked_hashes: mpsc::UnboundedReceiver<CrackedHash>,
    pub done: oneshot::Receiver<DoneOutcome>,
}

/// Wraps one hashcat child process for the lifetime of one task.
pub struct SessionSupervisor {
    binary: PathBuf,
    args: Vec<String>,
    restore_file: PathBuf,
    out_file: PathBuf,
    state: Arc<Mutex<LifecycleState>>,
    kill_token: CancellationToken,
    tailer_cancel: CancellationToken,
}

impl SessionSupervisor {
    /// Build a supervisor for `params`, using `binary` as the hashcat
    /// executable and appending `platform_extra_args` (e.g.
    /// `--backend-ignore-opencl` on macOS) after the standard argument set.
    pub fn new(binary: PathBuf, params: &Params, platform_extra_args: &[String]) -> Self {
        let mut args = build_args(params);
        args.extend(platform_extra_args.iter().cloned());
        Self {
            binary,
            args,
            restore_file: params.restore_file.clone(),
            out_file: params.out_file.clone(),
            state: Arc::new(Mutex::new(LifecycleState::Created)),
            kill_token: CancellationToken::new(),
            tailer_cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    fn set_state(&self, state: LifecycleState) {
        *self.state.lock() = state;
    }

    /// Spawn the child and start the three concurrent workers (§5): stdout
    /// pump, stderr pump, outfile tailer. A spawn failure does not return
    /// `Err` — it transitions to `Exited` and reports on `DoneChan`,
    /// matching "failure transitions to Exited with an error on DoneChan".
    pub async fn start(&self) -> Result<SessionOutputs, SessionError> {
        if self.state() != LifecycleState::Created {
            return Err(SessionError::AlreadyStarted);
        }

        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let cracked_hashes =
            crate::outfile::spawn_tailer(self.out_file.clone(), self.tailer_cancel.clone());

        // A kill requested while still Created aborts the spawn outright.
        if self.kill_token.is_cancelled() {
            self.set_state(LifecycleState::Killed);
            let _ = done_tx.send(DoneOutcome::SpawnFailed("killed before start".to_string()));
            return Ok(SessionOutputs {
                stdout_lines: stdout_rx,
                stderr_messages: stderr_rx,
                status_updates: status_rx,
                cracked_hashes,
                done: done_rx,
            });
        }

        self.set_state(LifecycleState::Started);

        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.set_state(LifecycleState::Exited);
                let _ = done_tx.send(DoneOutcome::SpawnFailed(e.to_string()));
                return Ok(SessionOutputs {
                    stdout_lines: stdout_rx,
                    stderr_messages: stderr_rx,
                    status_updates: status_rx,
                    cracked_hashes,
                    done: done_rx,
                });
            }
        };
        self.set_state(LifecycleState::Running);

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let stdout_handle = tokio::spawn(pump_stdout(stdout, stdout_tx, status_tx));
        let restore_file = self.restore_file.clone();
        let stale_restore = Arc::new(AtomicBool::new(false));
        let stderr_handle = tokio::spawn(pump_stderr(
            stderr,
            stderr_tx,
            restore_file,
            Arc::clone(&stale_restore),
        ));

        let state = Arc::clone(&self.state);
        let kill_token = self.kill_token.clone();

        tokio::spawn(async move {
            let wait_result = tokio::select! {
                biased;
                _ = kill_token.cancelled() => {
                    let _ = child.start_kill();
                    child.wait().await
                }
                result = child.wait() => result,
            };
            let _ = stdout_handle.await;
            let _ = stderr_handle.await;

            let outcome = match wait_result {
                Ok(status) => DoneOutcome::Exited {
                    code: status.code(),
                    message: format_exit(&status),
                    stale_restore: stale_restore.load(Ordering::SeqCst),
                },
                Err(e) => DoneOutcome::SpawnFailed(e.to_string()),
            };

            {
                let mut guard = state.lock();
                if *guard != LifecycleState::Killed {
                    *guard = LifecycleState::Exited;
                }
            }
            let _ = done_tx.send(outcome);
        });

        Ok(SessionOutputs {
            stdout_lines: stdout_rx,
            stderr_messages: stderr_rx,
            status_updates: status_rx,
            cracked_hashes,
            done: done_rx,
        })
    }

    /// Idempotent: cancelling an already-cancelled token is a no-op. A kill
    /// during `Start` aborts the spawn (checked at the top of `start`); a
    /// kill after `Exited` has nothing left to signal.
    pub fn kill(&self) {
        if matches!(self.state(), LifecycleState::Exited | LifecycleState::Killed) {
            return;
        }
        self.set_state(LifecycleState::Killed);
        self.kill_token.cancel();
    }

    /// Removes the restore file if it still exists and stops the outfile
    /// tailer. Safe to call even if the restore file was already removed
    /// by the stale-restore detector.
    pub fn cleanup(&self) {
        self.tailer_cancel.cancel();
        if self.restore_file.exists() {
            if let Err(e) = std::fs::remove_file(&self.restore_file) {
                tracing::debug!(path = %self.restore_file.display(), error = %e, "restore file cleanup failed");
            }
        }
        self.set_state(LifecycleState::CleanedUp);
    }
}

async fn pump_stdout(
    stdout: tokio::process::ChildStdout,
    stdout_tx: mpsc::UnboundedSender<String>,
    status_tx: mpsc::UnboundedSender<Status>,
) {
    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    let pump = tokio::spawn(pump_lines(stdout, line_tx));
    while let Some(line) = line_rx.recv().await {
        let parsed = Status::parse_line(&line);
        let _ = stdout_tx.send(line);
        if let Some(status) = parsed {
            let _ = status_tx.send(status);
        }
    }
    let _ = pump.await;
}

async fn pump_stderr(
    stderr: tokio::process::ChildStderr,
    stderr_tx: mpsc::UnboundedSender<String>,
    restore_file: PathBuf,
    stale_restore: Arc<AtomicBool>,
) {
    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    let pump = tokio::spawn(pump_lines(stderr, line_tx));
    let needle = format!("Cannot read {}", restore_file.display());
    while let Some(line) = line_rx.recv().await {
        if line.contains(&needle) && !stale_restore.swap(true, Ordering::SeqCst) {
            if restore_file.exists() {
                if let Err(e) = std::fs::remove_file(&restore_file) {
                    tracing::debug!(path = %restore_file.display(), error = %e, "stale restore file removal failed");
                }
            }
        }
        let _ = stderr_tx.send(line);
    }
    let _ = pump.await;
}

fn format_exit(status: &std::process::ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {code}"),
        None => "process terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::id::AttackId;
    use agent_core::AttackModeHashcat;
    use std::time::Duration;
    use tempfile::tempdir;

    fn params_with_paths(dir: &std::path::Path) -> Params {
        Params {
            attack_id: AttackId::new(5),
            hash_mode: 0,
            attack_mode: AttackModeHashcat::Dictionary,
            hash_file: dir.join("hashlist.txt"),
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
            attack_benchmark: false,
            status_timer: Duration::from_secs(10),
            restore_file: dir.join("5.restore"),
            out_file: dir.join("5.out"),
        }
    }

    #[tokio::test]
    async fn successful_run_reports_exit_status_verbatim() {
        let dir = tempdir().unwrap();
        let params = params_with_paths(dir.path());
        let supervisor = SessionSupervisor::new(PathBuf::from("true"), &params, &[]);
        let mut outputs = supervisor.start().await.unwrap();
        let outcome = outputs.done.await.unwrap();
        match outcome {
            DoneOutcome::Exited { code, .. } => assert_eq!(code, Some(0)),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(supervisor.state(), LifecycleState::Exited);
    }

    #[tokio::test]
    async fn exit_code_one_is_conveyed_verbatim() {
        let dir = tempdir().unwrap();
        let params = params_with_paths(dir.path());
        let supervisor = SessionSupervisor::new(PathBuf::from("false"), &params, &[]);
        let mut outputs = supervisor.start().await.unwrap();
        let outcome = outputs.done.await.unwrap();
        match outcome {
            DoneOutcome::Exited { code, message, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "exit status 1");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn spawn_failure_reports_on_done_channel_not_as_start_error() {
        let dir = tempdir().unwrap();
        let params = params_with_paths(dir.path());
        let supervisor =
            SessionSupervisor::new(PathBuf::from("/nonexistent/binary/for/sure"), &params, &[]);
        let mut outputs = supervisor.start().await.unwrap();
        let outcome = outputs.done.await.unwrap();
        assert!(matches!(outcome, DoneOutcome::SpawnFailed(_)));
        assert_eq!(supervisor.state(), LifecycleState::Exited);
    }

    #[tokio::test]
    async fn starting_twice_is_an_error() {
        let dir = tempdir().unwrap();
        let params = params_with_paths(dir.path());
        let supervisor = SessionSupervisor::new(PathBuf::from("true"), &params, &[]);
        let _ = supervisor.start().await.unwrap();
        let second = supervisor.start().await;
        assert!(matches!(second, Err(SessionError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn kill_is_idempotent() {
        let dir = tempdir().unwrap();
        let params = params_with_paths(dir.path());
        let supervisor = SessionSupervisor::new(PathBuf::from("sleep"), &params, &["5".to_string()]);
        let mut outputs = supervisor.start().await.unwrap();
        supervisor.kill();
        supervisor.kill();
        let outcome = outputs.done.await.unwrap();
        assert!(matches!(outcome, DoneOutcome::Exited { .. }));
    }

    #[tokio::test]
    async fn cleanup_removes_restore_file_if_present() {
        let dir = tempdir().unwrap();
        let params = params_with_paths(dir.path());
        std::fs::write(&params.restore_file, b"restore-data").unwrap();
        let supervisor = SessionSupervisor::new(PathBuf::from("true"), &params, &[]);
        let _ = supervisor.start().await.unwrap();
        supervisor.cleanup();
        assert!(!params.restore_file.exists());
        assert_eq!(supervisor.state(), LifecycleState::CleanedUp);
    }

    #[tokio::test]
    async fn cleanup_is_a_no_op_when_restore_file_absent() {
        let dir = tempdir().unwrap();
        let params = params_with_paths(dir.path());
        let supervisor = SessionSupervisor::new(PathBuf::from("true"), &params, &[]);
        let _ = supervisor.start().await.unwrap();
        supervisor.cleanup();
        supervisor.cleanup();
    }
}
