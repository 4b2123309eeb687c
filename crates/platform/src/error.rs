// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("refused to run {binary:?}: not on the allowlist")]
    BinaryNotAllowed { binary: String },

    #[error("refused argument containing shell metacharacters: {0:?}")]
    UnsafeArgument(String),

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("could not parse output of {command}: {reason}")]
    UnparseableOutput { command: String, reason: String },

    #[error("extraction of {src} failed: {reason}")]
    ExtractionFailed { src: String, reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
