// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A contiguous slice of an attack's keyspace assigned to this agent.

use crate::id::{AttackId, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub attack_id: AttackId,
    #[serde(default)]
    pub skip: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl Task {
    /// `skip`/`limit` may be absent on the wire; callers always want the
    /// materialized `0` default rather than threading `Option` through the
    /// command-line builder.
    pub fn skip_or_zero(&self) -> u64 {
        self.skip.unwrap_or(0)
    }

    pub fn limit_or_zero(&self) -> u64 {
        self.limit.unwrap_or(0)
    }
}
