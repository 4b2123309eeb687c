// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration refreshed from the control plane each control-loop
//! iteration when [`crate::AgentState::reload_requested`] is set.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration pulled from `GET /configuration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfiguration {
    pub use_native_hashcat: bool,
    #[serde(with = "duration_secs")]
    pub agent_update_interval: Duration,
    pub backend_devices: String,
    pub opencl_devices: String,
    pub api_version: i32,
}

impl Default for AgentConfiguration {
    fn default() -> Self {
        Self {
            use_native_hashcat: false,
            agent_update_interval: Duration::from_secs(30),
            backend_devices: String::new(),
            opencl_devices: String::new(),
            api_version: 1,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
