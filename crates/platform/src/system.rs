// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Production `Platform` implementation, dispatching on `cfg(target_os)`.

use crate::error::PlatformError;
use crate::exec::run_allowlisted;
use crate::host_info::HostInfo;
use crate::Platform;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(300);
const VERSION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPlatform;

#[async_trait]
impl Platform for SystemPlatform {
    fn host_info(&self) -> HostInfo {
        HostInfo::probe()
    }

    async fn device_inventory(&self) -> Result<Vec<String>, PlatformError> {
        let cancel = CancellationToken::new();

        #[cfg(target_os = "linux")]
        {
            let output = run_allowlisted("lspci", &["-mm"], &cancel, PROBE_TIMEOUT).await?;
            Ok(parse_lspci(&String::from_utf8_lossy(&output.stdout)))
        }
        #[cfg(target_os = "macos")]
        {
            let output = run_allowlisted(
                "system_profiler",
                &["SPDisplaysDataType"],
                &cancel,
                PROBE_TIMEOUT,
            )
            .await?;
            Ok(parse_system_profiler(&String::from_utf8_lossy(&output.stdout)))
        }
        #[cfg(target_os = "windows")]
        {
            let output = run_allowlisted(
                "wmic",
                &["path", "win32_VideoController", "get", "name"],
                &cancel,
                PROBE_TIMEOUT,
            )
            .await?;
            Ok(parse_wmic(&String::from_utf8_lossy(&output.stdout)))
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            Ok(Vec::new())
        }
    }

    async fn hashcat_version(&self, path: &Path) -> Result<String, PlatformError> {
        let path_str = path.to_string_lossy().to_string();
        crate::exec::ensure_safe_argument(&path_str)?;

        let cancel = CancellationToken::new();
        let mut cmd = tokio::process::Command::new(&path_str);
        cmd.arg("--version");

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(PlatformError::Cancelled),
            result = tokio::time::timeout(VERSION_TIMEOUT, cmd.output()) => match result {
                Ok(Ok(output)) => output,
                Ok(Err(source)) => {
                    return Err(PlatformError::Spawn { command: path_str, source })
                }
                Err(_) => {
                    return Err(PlatformError::NonZeroExit {
                        command: path_str,
                        status: "timed out".into(),
                        stderr: String::new(),
                    })
                }
            },
        };

        if !output.status.success() {
            return Err(PlatformError::NonZeroExit {
                command: path_str,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        String::from_utf8(output.stdout)
            .map(|s| s.lines().next().unwrap_or_default().trim().to_string())
            .map_err(|e| PlatformError::UnparseableOutput {
                command: "hashcat --version".to_string(),
                reason: e.to_string(),
            })
    }

    fn default_hashcat_binary_name(&self) -> &'static str {
        if cfg!(target_os = "windows") {
            "hashcat.exe"
        } else {
            "hashcat"
        }
    }

    fn additional_hashcat_args(&self) -> Vec<String> {
        if cfg!(target_os = "macos") {
            vec!["--backend-ignore-opencl".to_string()]
        } else {
            Vec::new()
        }
    }

    async fn extract_7z(
        &self,
        cancel: &CancellationToken,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        let src_str = src.to_string_lossy().to_string();
        let dst_arg = format!("-o{}", dst.to_string_lossy());

        let output = run_allowlisted(
            "7z",
            &["x", "-y", &dst_arg, &src_str],
            cancel,
            EXTRACT_TIMEOUT,
        )
        .await?;

        if !output.status.success() {
            return Err(PlatformError::ExtractionFailed {
                src: src_str,
                reason: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

/// Parse `lspci -mm` output: one quoted-field line per device, e.g.
/// `01:00.0 "VGA compatible controller" "NVIDIA Corporation" "GA102 [GeForce RTX 3090]" "Gigabyte" "Device 4234"`.
/// The device-model field is the 3rd quoted group (index 5 when the line is
/// split on `"`, since each quoted group is bracketed by a pair of quotes).
#[cfg(target_os = "linux")]
fn parse_lspci(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains("\"VGA compatible controller\"") || line.contains("\"3D controller\""))
        .filter_map(|line| line.split('"').nth(5).map(|s| s.to_string()))
        .collect()
}

#[cfg(target_os = "macos")]
fn parse_system_profiler(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Chipset Model:"))
        .map(|s| s.trim().to_string())
        .collect()
}

#[cfg(target_os = "windows")]
fn parse_wmic(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && *l != "Name")
        .map(|s| s.to_string())
        .collect()
}
