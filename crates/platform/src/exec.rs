// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared allowlisting and safe subprocess execution for platform probes.
//!
//! Every device-inventory / version / extraction probe shells out to a
//! fixed, hard-coded external binary. Per §4.A, implementations must use
//! only hard-coded binary names against an allowlist and reject argument
//! strings containing shell metacharacters.

use crate::error::PlatformError;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Characters that must never appear in an argument passed to an allowlisted
/// binary — even though `tokio::process::Command` never invokes a shell,
/// defense in depth means we still reject metacharacters outright so a
/// poisoned path/filename can't smuggle anything through a future refactor
/// that does shell out.
const SHELL_METACHARACTERS: &[char] = &['&', '|', ';', '>', '<', '`', '$', '\n', '\r'];

/// Binaries this process is ever allowed to spawn for platform probes.
pub const ALLOWED_BINARIES: &[&str] = &["lspci", "system_profiler", "wmic", "7z", "7za"];

pub fn ensure_allowed_binary(binary: &str) -> Result<(), PlatformError> {
    if ALLOWED_BINARIES.contains(&binary) {
        Ok(())
    } else {
        Err(PlatformError::BinaryNotAllowed {
            binary: binary.to_string(),
        })
    }
}

pub fn ensure_safe_argument(arg: &str) -> Result<(), PlatformError> {
    if arg.contains(SHELL_METACHARACTERS) {
        Err(PlatformError::UnsafeArgument(arg.to_string()))
    } else {
        Ok(())
    }
}

/// Run an allowlisted binary with sanitized arguments, honoring cancellation
/// and a hard timeout.
pub async fn run_allowlisted(
    binary: &str,
    args: &[&str],
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<Output, PlatformError> {
    ensure_allowed_binary(binary)?;
    for arg in args {
        ensure_safe_argument(arg)?;
    }

    let mut cmd = Command::new(binary);
    cmd.args(args);

    tokio::select! {
        _ = cancel.cancelled() => Err(PlatformError::Cancelled),
        result = tokio::time::timeout(timeout, cmd.output()) => {
            match result {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(source)) => Err(PlatformError::Spawn {
                    command: binary.to_string(),
                    source,
                }),
                Err(_elapsed) => Err(PlatformError::NonZeroExit {
                    command: binary.to_string(),
                    status: "timed out".to_string(),
                    stderr: String::new(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_binary_not_on_allowlist() {
        assert!(ensure_allowed_binary("rm").is_err());
        assert!(ensure_allowed_binary("lspci").is_ok());
    }

    #[test]
    fn rejects_arguments_with_shell_metacharacters() {
        assert!(ensure_safe_argument("safe-value").is_ok());
        for bad in ["a;b", "a|b", "a&b", "a>b", "a<b", "a`b", "a$b", "a\nb"] {
            assert!(ensure_safe_argument(bad).is_err(), "expected {bad:?} to be rejected");
        }
    }
}
