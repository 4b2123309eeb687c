// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("benchmark cache error: {0}")]
    Cache(#[from] agent_storage::BenchmarkCacheError),

    #[error("session error: {0}")]
    Session(#[from] agent_session::SessionError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
