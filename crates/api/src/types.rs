// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level request/response DTOs for the `<Url>/api/v1/client` protocol (§6).

use agent_core::{Severity, Status};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticateResponse {
    pub agent_id: u64,
    pub authenticated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigurationResponse {
    pub api_version: i32,
    pub config: ConfigurationBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigurationBody {
    pub use_native_hashcat: bool,
    pub agent_update_interval: u64,
    pub backend_device: String,
    pub opencl_devices: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentMetadataUpdate {
    pub hostname: String,
    pub client_signature: String,
    pub operating_system: String,
    pub devices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrackerUpdateResponse {
    pub available: bool,
    pub version: Option<String>,
    pub download_url: Option<String>,
    pub exec_name: Option<String>,
}

/// Server-facing status payload, translated from [`Status`] per §4.F.
///
/// The mapping from hashcat's `guess_base_percent`/`guess_mod_percent` to
/// `guess_base_percentage`/`guess_mod_percentage` is deliberate — see the
/// design note on the double-submission bug this corrects.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusPayload {
    pub original_line: String,
    pub time: i64,
    pub session: String,
    pub hashcat_guess: HashcatGuessPayload,
    pub status: i32,
    pub target: String,
    pub progress: [u64; 2],
    pub restore_point: u64,
    pub recovered_hashes: [u64; 2],
    pub recovered_salts: [u64; 2],
    pub rejected: u64,
    pub time_start: i64,
    pub estimated_stop: i64,
    pub device_statuses: Vec<DeviceStatusPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HashcatGuessPayload {
    pub guess_base: String,
    pub guess_base_count: u64,
    pub guess_base_offset: u64,
    pub guess_base_percentage: f64,
    pub guess_mod: String,
    pub guess_mod_count: u64,
    pub guess_mod_offset: u64,
    pub guess_mod_percentage: f64,
    pub guess_mode: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatusPayload {
    pub device_id: i32,
    pub device_name: String,
    pub device_type: String,
    pub speed: u64,
    pub util: i32,
    pub temp: i32,
}

impl TaskStatusPayload {
    /// Build the wire payload from a parsed `Status`, stamping `time` with
    /// `now` if the cracker didn't report one.
    pub fn from_status(status: &Status, now_unix: i64) -> Self {
        let time = status.time.unwrap_or(now_unix);
        Self {
            original_line: status.original_line.clone(),
            time,
            session: status.session.clone(),
            hashcat_guess: HashcatGuessPayload {
                guess_base: status.guess.guess_base.clone(),
                guess_base_count: status.guess.guess_base_count,
                guess_base_offset: status.guess.guess_base_offset,
                guess_base_percentage: status.guess.guess_base_percent,
                guess_mod: status.guess.guess_mod.clone(),
                guess_mod_count: status.guess.guess_mod_count,
                guess_mod_offset: status.guess.guess_mod_offset,
                guess_mod_percentage: status.guess.guess_mod_percent,
                guess_mode: status.guess.guess_mode,
            },
            status: status.status,
            target: status.target.clone(),
            progress: status.progress,
            restore_point: status.restore_point,
            recovered_hashes: status.recovered_hashes,
            recovered_salts: status.recovered_salts,
            rejected: status.rejected,
            time_start: status.time_start,
            estimated_stop: status.estimated_stop,
            device_statuses: status
                .devices
                .iter()
                .map(|d| DeviceStatusPayload {
                    device_id: d.device_id,
                    device_name: d.device_name.clone(),
                    device_type: d.device_type.clone(),
                    speed: d.speed,
                    util: d.util,
                    temp: d.temp,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitCrackPayload {
    pub timestamp: String,
    pub hash: String,
    pub plaintext: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRowPayload {
    pub device: String,
    pub hash_type: String,
    pub runtime: String,
    pub hash_time: String,
    pub speed: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetTaskAbandonedErrorBody {
    #[serde(default)]
    pub details: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitErrorPayload {
    pub message: String,
    pub severity: String,
    pub metadata: SubmitErrorMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitErrorMetadata {
    pub platform: String,
    pub version: String,
}

impl SubmitErrorPayload {
    pub fn new(
        message: String,
        severity: Severity,
        platform: String,
        version: String,
        task_id: Option<u64>,
    ) -> Self {
        Self {
            message,
            severity: severity.to_string().to_lowercase(),
            metadata: SubmitErrorMetadata { platform, version },
            task_id,
        }
    }
}
