// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Params` — the session input derived from an `Attack` + `Task` pair.
//!
//! All optional fields are materialized with defaults (`0`/`""`/`false`)
//! before a session is built; nothing downstream of [`Params`] should need
//! to special-case an absent value.

use crate::attack::{Attack, AttackModeHashcat};
use crate::id::AttackId;
use crate::task::Task;
use std::path::PathBuf;
use std::time::Duration;

/// Default `--status-timer` value, in seconds.
pub const DEFAULT_STATUS_TIMER_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub attack_id: AttackId,
    pub hash_mode: u32,
    pub attack_mode: AttackModeHashcat,

    pub hash_file: PathBuf,
    pub word_list: Option<PathBuf>,
    pub rule_list: Option<PathBuf>,
    pub mask_list: Option<PathBuf>,
    pub mask: Option<String>,

    pub mask_increment: bool,
    pub increment_minimum: u32,
    pub increment_maximum: u32,

    pub custom_charset_1: Option<String>,
    pub custom_charset_2: Option<String>,
    pub custom_charset_3: Option<String>,
    pub custom_charset_4: Option<String>,

    pub optimized_kernels: bool,
    pub slow_candidates: bool,

    pub skip: u64,
    pub limit: u64,

    pub backend_devices: Option<String>,
    pub opencl_devices: Option<String>,
    pub additional_args: Vec<String>,

    pub attack_benchmark: bool,

    pub status_timer: Duration,
    pub restore_file: PathBuf,
    pub out_file: PathBuf,
}

impl Params {
    /// Build session parameters for a regular cracking task.
    ///
    /// `hashlist_path`/`restore_path`/`out_path` are the per-agent roots
    /// (`AgentState::paths`); the filenames are keyed by hash list / attack
    /// id respectively (§3).
    pub fn for_task(
        attack: &Attack,
        task: &Task,
        hashlist_path: &std::path::Path,
        restore_path: &std::path::Path,
        out_path: &std::path::Path,
    ) -> Self {
        Self {
            attack_id: attack.id,
            hash_mode: attack.hash_mode,
            attack_mode: attack.attack_mode_hashcat,
            hash_file: hashlist_path.join(format!("{}.txt", attack.hash_list_id)),
            word_list: attack.word_list.as_ref().map(|r| PathBuf::from(&r.file_name)),
            rule_list: attack.rule_list.as_ref().map(|r| PathBuf::from(&r.file_name)),
            mask_list: attack.mask_list.as_ref().map(|r| PathBuf::from(&r.file_name)),
            mask: attack.mask.clone(),
            mask_increment: attack.increment_mode,
            increment_minimum: attack.increment_minimum.unwrap_or(0),
            increment_maximum: attack.increment_maximum.unwrap_or(0),
            custom_charset_1: attack.custom_charset_1.clone(),
            custom_charset_2: attack.custom_charset_2.clone(),
            custom_charset_3: attack.custom_charset_3.clone(),
            custom_charset_4: attack.custom_charset_4.clone(),
            optimized_kernels: attack.optimized,
            slow_candidates: attack.slow_candidate_generators,
            skip: task.skip_or_zero(),
            limit: task.limit_or_zero(),
            backend_devices: None,
            opencl_devices: None,
            additional_args: Vec::new(),
            attack_benchmark: false,
            status_timer: Duration::from_secs(DEFAULT_STATUS_TIMER_SECS),
            restore_file: restore_path.join(format!("{}.restore", attack.id)),
            out_file: out_path.join(format!("{}.out", attack.id)),
        }
    }

    pub fn with_backend_devices(mut self, devices: impl Into<String>) -> Self {
        let devices = devices.into();
        if !devices.is_empty() {
            self.backend_devices = Some(devices);
        }
        self
    }

    pub fn with_opencl_devices(mut self, devices: impl Into<String>) -> Self {
        let devices = devices.into();
        if !devices.is_empty() {
            self.opencl_devices = Some(devices);
        }
        self
    }

    pub fn with_additional_args(mut self, args: Vec<String>) -> Self {
        self.additional_args = args;
        self
    }
}
