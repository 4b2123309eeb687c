// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for [`crate::ApiClient`] operations (§4.B, §7).

use thiserror::Error;

/// Coarse classification of an HTTP status code, used by callers to branch
/// without re-deriving it from the raw code every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// 404 — the resource (task, attack) no longer exists.
    NotFound,
    /// 410 — the resource was revoked; distinct from "never existed".
    Gone,
    /// 422 — request was well-formed but rejected (e.g. already-accepted task).
    Unprocessable,
    /// 401/403 — the agent's credentials are rejected. Fatal for the session,
    /// never reported upstream.
    Unauthorized,
    /// Any other 4xx.
    ClientError,
    /// Any 5xx, or a network-level failure that is presumed retryable.
    Transient,
}

impl StatusKind {
    pub fn classify(status: u16) -> Self {
        match status {
            401 | 403 => StatusKind::Unauthorized,
            404 => StatusKind::NotFound,
            410 => StatusKind::Gone,
            422 => StatusKind::Unprocessable,
            400..=499 => StatusKind::ClientError,
            _ => StatusKind::Transient,
        }
    }
}

/// Errors surfaced by every [`crate::ApiClient`] RPC.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An HTTP response outside the success range for the operation.
    #[error("api error {code} ({kind:?}): {message}")]
    Http {
        kind: StatusKind,
        code: u16,
        message: String,
        body: Option<String>,
    },

    /// The structured error body returned by `set_abandoned`.
    #[error("task abandon rejected: {details:?}")]
    SetTaskAbandoned {
        details: Vec<String>,
        error: Option<String>,
    },

    /// Transport-level failure (DNS, connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not parse as the expected JSON shape.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local file I/O failure while streaming a download to disk.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The governing cancellation token fired before the RPC completed.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn http(code: u16, message: impl Into<String>, body: Option<String>) -> Self {
        ApiError::Http {
            kind: StatusKind::classify(code),
            code,
            message: message.into(),
            body,
        }
    }

    pub fn status_kind(&self) -> Option<StatusKind> {
        match self {
            ApiError::Http { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status_kind(), Some(StatusKind::Unauthorized))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.status_kind(), Some(StatusKind::NotFound))
    }

    pub fn is_gone(&self) -> bool {
        matches!(self.status_kind(), Some(StatusKind::Gone))
    }

    pub fn is_unprocessable(&self) -> bool {
        matches!(self.status_kind(), Some(StatusKind::Unprocessable))
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self.status_kind(),
            Some(StatusKind::ClientError)
                | Some(StatusKind::NotFound)
                | Some(StatusKind::Gone)
                | Some(StatusKind::Unprocessable)
        )
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.status_kind(), Some(StatusKind::Transient))
            || matches!(self, ApiError::Transport(_))
    }
}
