// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Unrecoverable startup/shutdown failures. Every variant here maps to
/// exit code `1` (§6) — transient RPC failures never surface as this type.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("another agent is already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("authentication rejected: {0}")]
    Unauthenticated(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("api error: {0}")]
    Api(#[from] agent_api::ApiError),

    #[error("platform error: {0}")]
    Platform(#[from] agent_platform::PlatformError),

    #[error("runner error: {0}")]
    Runner(#[from] agent_runner::RunnerError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
