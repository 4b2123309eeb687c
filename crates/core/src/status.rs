// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Status` — one JSON record parsed from hashcat's `--status-json` stdout.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: i32,
    pub device_name: String,
    pub device_type: String,
    pub speed: u64,
    pub util: i32,
    pub temp: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuessStatus {
    #[serde(default)]
    pub guess_base: String,
    #[serde(default)]
    pub guess_base_count: u64,
    #[serde(default)]
    pub guess_base_offset: u64,
    #[serde(default)]
    pub guess_base_percent: f64,
    #[serde(default)]
    pub guess_mod: String,
    #[serde(default)]
    pub guess_mod_count: u64,
    #[serde(default)]
    pub guess_mod_offset: u64,
    #[serde(default)]
    pub guess_mod_percent: f64,
    #[serde(default)]
    pub guess_mode: i32,
}

/// One line of hashcat's `--status-json` output.
///
/// `time` is stamped by [`Status::with_current_time`] when the cracker omits
/// it, per §4.F `SendStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub session: String,
    #[serde(default)]
    pub time: Option<i64>,
    pub status: i32,
    pub target: String,
    pub progress: [u64; 2],
    pub restore_point: u64,
    pub recovered_hashes: [u64; 2],
    pub recovered_salts: [u64; 2],
    pub rejected: u64,
    pub time_start: i64,
    pub estimated_stop: i64,
    #[serde(default)]
    pub devices: Vec<DeviceStatus>,
    #[serde(default)]
    pub guess: GuessStatus,
    #[serde(default)]
    pub original_line: String,
}

impl Status {
    /// Parse one stdout line as hashcat status JSON, returning `None` for
    /// any line that isn't valid `Status` JSON (§4.F: discard silently).
    pub fn parse_line(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }

    /// Stamp `time = now()` if the cracker omitted it.
    pub fn with_current_time_if_absent(mut self, now_unix: i64) -> Self {
        if self.time.is_none() {
            self.time = Some(now_unix);
        }
        self
    }
}
