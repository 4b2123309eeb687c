// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide agent identity, filesystem roots, and activity state.

use crate::id::AgentId;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// What the agent is doing right now.
///
/// Transitions are monotonic within a single control-loop iteration and
/// always return to `Waiting` or `Stopping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentActivity {
    Starting,
    Updating,
    Benchmarking,
    Waiting,
    Cracking,
    Stopping,
}

impl std::fmt::Display for CurrentActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Updating => "updating",
            Self::Benchmarking => "benchmarking",
            Self::Waiting => "waiting",
            Self::Cracking => "cracking",
            Self::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Filesystem roots derived from the agent's configured data path.
///
/// All paths are computed once at startup from `data_path` and never change
/// for the life of the process.
#[derive(Debug, Clone)]
pub struct FilePaths {
    pub data_path: PathBuf,
    pub file_path: PathBuf,
    pub crackers_path: PathBuf,
    pub hashlist_path: PathBuf,
    pub zaps_path: PathBuf,
    pub preprocessors_path: PathBuf,
    pub tools_path: PathBuf,
    pub out_path: PathBuf,
    pub restore_file_path: PathBuf,
    pub benchmark_cache_path: PathBuf,
    pub pid_file: PathBuf,
}

impl FilePaths {
    pub fn derive(data_path: impl Into<PathBuf>) -> Self {
        let data_path = data_path.into();
        Self {
            file_path: data_path.join("files"),
            crackers_path: data_path.join("crackers"),
            hashlist_path: data_path.join("hashlists"),
            zaps_path: data_path.join("zaps"),
            preprocessors_path: data_path.join("preprocessors"),
            tools_path: data_path.join("tools"),
            out_path: data_path.join("out"),
            restore_file_path: data_path.join("restore"),
            benchmark_cache_path: data_path.join("benchmark_cache.json"),
            pid_file: data_path.join("agent.pid"),
            data_path,
        }
    }

    /// Every directory that must exist before the agent can run (everything
    /// except the two leaf files `benchmark_cache_path` and `pid_file`).
    pub fn directories(&self) -> [&Path; 8] {
        [
            &self.data_path,
            &self.file_path,
            &self.crackers_path,
            &self.hashlist_path,
            &self.zaps_path,
            &self.preprocessors_path,
            &self.tools_path,
            &self.out_path,
        ]
    }
}

/// Process-wide, single-instance agent identity and mutable runtime flags.
///
/// Initialized once at process start from configuration. Mutated only by the
/// controller and the signal handler; read freely by every other component.
pub struct AgentState {
    pub agent_id: RwLock<Option<AgentId>>,
    pub api_token: String,
    pub url: String,
    pub paths: FilePaths,

    pub benchmarks_submitted: AtomicBool,
    pub job_checking_stopped: AtomicBool,
    pub reload: AtomicBool,
    pub extra_debugging: AtomicBool,
    pub debug: AtomicBool,

    activity: RwLock<CurrentActivity>,
}

impl AgentState {
    pub fn new(api_token: impl Into<String>, url: impl Into<String>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            agent_id: RwLock::new(None),
            api_token: api_token.into(),
            url: url.into(),
            paths: FilePaths::derive(data_path),
            benchmarks_submitted: AtomicBool::new(false),
            job_checking_stopped: AtomicBool::new(false),
            reload: AtomicBool::new(false),
            extra_debugging: AtomicBool::new(false),
            debug: AtomicBool::new(false),
            activity: RwLock::new(CurrentActivity::Starting),
        }
    }

    pub fn agent_id(&self) -> Option<AgentId> {
        *self.agent_id.read()
    }

    pub fn set_agent_id(&self, id: AgentId) {
        *self.agent_id.write() = Some(id);
    }

    pub fn activity(&self) -> CurrentActivity {
        *self.activity.read()
    }

    pub fn set_activity(&self, activity: CurrentActivity) {
        *self.activity.write() = activity;
    }

    pub fn benchmarks_submitted(&self) -> bool {
        self.benchmarks_submitted.load(Ordering::SeqCst)
    }

    pub fn set_benchmarks_submitted(&self, value: bool) {
        self.benchmarks_submitted.store(value, Ordering::SeqCst);
    }

    pub fn job_checking_stopped(&self) -> bool {
        self.job_checking_stopped.load(Ordering::SeqCst)
    }

    pub fn reload_requested(&self) -> bool {
        self.reload.load(Ordering::SeqCst)
    }

    pub fn request_reload(&self) {
        self.reload.store(true, Ordering::SeqCst);
    }

    pub fn clear_reload(&self) {
        self.reload.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_paths_under_data_root() {
        let paths = FilePaths::derive("/var/lib/agent");
        assert_eq!(paths.hashlist_path, Path::new("/var/lib/agent/hashlists"));
        assert_eq!(paths.pid_file, Path::new("/var/lib/agent/agent.pid"));
        assert_eq!(paths.benchmark_cache_path, Path::new("/var/lib/agent/benchmark_cache.json"));
    }

    #[test]
    fn activity_transitions_are_observable() {
        let state = AgentState::new("token", "https://example.test", "/tmp/agent");
        assert_eq!(state.activity(), CurrentActivity::Starting);
        state.set_activity(CurrentActivity::Waiting);
        assert_eq!(state.activity(), CurrentActivity::Waiting);
    }

    #[test]
    fn reload_flag_round_trips() {
        let state = AgentState::new("token", "https://example.test", "/tmp/agent");
        assert!(!state.reload_requested());
        state.request_reload();
        assert!(state.reload_requested());
        state.clear_reload();
        assert!(!state.reload_requested());
    }
}
