// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local agent configuration: the values needed before the control plane
//! can be reached at all (`url`, `token`, `data_path`, ...). Resolved in
//! precedence order CLI flags > environment variables > `<data_path>/agent.toml`,
//! mirroring the teacher's `Config::load()` resolving a state directory from
//! layered sources.

use crate::cli::RunArgs;
use crate::error::DaemonError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Locally-sourced settings that exist before the agent can talk to the
/// control plane. Distinct from [`agent_core::AgentConfiguration`], which is
/// fetched *from* the control plane once `url`/`token` are known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    pub url: String,
    pub token: String,
    pub data_path: PathBuf,
    pub hashcat_path: Option<PathBuf>,
    pub use_native_hashcat: bool,
    #[serde(default)]
    pub force_benchmark_run: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub extra_debug: bool,
}

impl LocalConfig {
    /// Resolve a [`LocalConfig`] from CLI flags, falling back to
    /// environment variables, then to `<data_path>/agent.toml`.
    ///
    /// `data_path` itself must come from a CLI flag or `AGENT_DATA_PATH`
    /// before a config file path can even be known, so it's resolved first
    /// and is never read from the file it names.
    pub fn resolve(args: &RunArgs) -> Result<Self, DaemonError> {
        let data_path = args
            .data_path
            .clone()
            .or_else(|| std::env::var("AGENT_DATA_PATH").ok().map(PathBuf::from))
            .ok_or_else(|| DaemonError::InvalidConfig("data-path is required".to_string()))?;

        let from_file = load_file(&data_path.join("agent.toml"));

        let url = args
            .url
            .clone()
            .or_else(|| std::env::var("AGENT_URL").ok())
            .or_else(|| from_file.as_ref().map(|f| f.url.clone()))
            .ok_or_else(|| DaemonError::InvalidConfig("url is required".to_string()))?;

        let token = args
            .token
            .clone()
            .or_else(|| std::env::var("AGENT_TOKEN").ok())
            .or_else(|| from_file.as_ref().map(|f| f.token.clone()))
            .ok_or_else(|| DaemonError::InvalidConfig("token is required".to_string()))?;

        let hashcat_path = args
            .hashcat_path
            .clone()
            .or_else(|| from_file.as_ref().and_then(|f| f.hashcat_path.clone()));

        let use_native_hashcat = args.use_native_hashcat
            || hashcat_path.is_some()
            || from_file.as_ref().is_some_and(|f| f.use_native_hashcat);

        Ok(Self {
            url,
            token,
            data_path,
            hashcat_path,
            use_native_hashcat,
            force_benchmark_run: args.force_benchmark_run
                || from_file.as_ref().is_some_and(|f| f.force_benchmark_run),
            debug: args.debug || from_file.as_ref().is_some_and(|f| f.debug),
            extra_debug: args.extra_debug || from_file.as_ref().is_some_and(|f| f.extra_debug),
        })
    }

    /// Persist the resolved config back to `<data_path>/agent.toml`, so a
    /// bare re-run of `crackagentd run` without flags picks it back up.
    pub fn persist(&self) -> Result<(), DaemonError> {
        let path = self.data_path.join("agent.toml");
        let body = toml::to_string_pretty(self)
            .map_err(|e| DaemonError::InvalidConfig(format!("could not serialize config: {e}")))?;
        std::fs::write(path, body)?;
        Ok(())
    }
}

fn load_file(path: &Path) -> Option<LocalConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    toml::from_str(&contents).ok()
}
