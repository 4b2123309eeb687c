// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`ErrorReporter`] — the single sink errors flow through on their way
//! upstream (§4.C). Reporting must never recurse: a failure while
//! submitting an error report is logged locally and nothing more.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::SubmitErrorPayload;
use agent_core::{Severity, TaskId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Category tags a caller can attach for downstream triage. Not
/// exhaustive — new categories can be added without changing the sink's
/// signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Generic,
    AcceptTask,
    SubmitCrack,
    SubmitStatus,
    SetTaskAbandoned,
    Auth,
}

/// Reports an error to the control plane, applying the severity/visibility
/// policy from §4.C. Construct with process metadata (`platform`, agent
/// version) once at startup.
pub struct ErrorReporter {
    client: Arc<dyn ApiClient>,
    platform: String,
    version: String,
}

impl ErrorReporter {
    pub fn new(client: Arc<dyn ApiClient>, platform: String, version: String) -> Self {
        Self {
            client,
            platform,
            version,
        }
    }

    /// Report `message` upstream, applying category-specific severity
    /// downgrades and auth-context log-only handling. Never propagates a
    /// failure of the report itself — see [`Self::log_only`].
    pub async fn report(
        &self,
        cancel: &CancellationToken,
        agent_id: u64,
        message: impl Into<String>,
        task: Option<TaskId>,
        severity: Severity,
        category: ErrorCategory,
    ) {
        let message = message.into();
        let effective_severity = self.downgrade_for_category(severity, category);
        // Purely local correlation id, not part of the wire payload — lets a
        // "report failed, logging locally" line be matched back to the
        // attempt that produced it without round-tripping through the server.
        let report_id = Uuid::new_v4();

        if category == ErrorCategory::Auth {
            warn!(
                %report_id,
                agent_id,
                has_token = !self.client.token().is_empty(),
                url = %self.client.base_url(),
                %message,
                "auth failure — not reported upstream"
            );
            return;
        }

        let payload = SubmitErrorPayload::new(
            message.clone(),
            effective_severity,
            self.platform.clone(),
            self.version.clone(),
            task.map(|t| t.get()),
        );

        if let Err(e) = self
            .client
            .submit_error(cancel, agent_id, &payload)
            .await
        {
            self.log_only(report_id, &message, effective_severity, &e);
        }
    }

    /// Report a `set_abandoned` rejection, which always logs its
    /// `details[]` (falling back to `error`) and is reported at `Warning`.
    pub async fn report_set_task_abandoned(
        &self,
        cancel: &CancellationToken,
        agent_id: u64,
        task: TaskId,
        details: &[String],
        error: Option<&str>,
    ) {
        let message = if !details.is_empty() {
            details.join("; ")
        } else {
            error.unwrap_or("set_abandoned rejected").to_string()
        };
        self.report(
            cancel,
            agent_id,
            message,
            Some(task),
            Severity::Warning,
            ErrorCategory::SetTaskAbandoned,
        )
        .await;
    }

    /// Downgrade severity per policy: generic errors stay `Critical` for
    /// visibility; client errors (4xx) on `AcceptTask` downgrade to `Info`,
    /// and on `SubmitCrack` downgrade to `Major`.
    fn downgrade_for_category(&self, severity: Severity, category: ErrorCategory) -> Severity {
        match category {
            ErrorCategory::AcceptTask => Severity::Info,
            ErrorCategory::SubmitCrack => Severity::Major,
            _ => severity,
        }
    }

    /// Failures of the reporter itself never recurse into another `report`
    /// call — they are logged locally only.
    fn log_only(&self, report_id: Uuid, message: &str, severity: Severity, error: &ApiError) {
        debug!(%report_id, %severity, %message, %error, "error reporter failed; logging locally only");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeApiClient;

    #[tokio::test]
    async fn accept_task_failures_downgrade_to_info() {
        let fake = Arc::new(FakeApiClient::new());
        let reporter = ErrorReporter::new(fake.clone(), "linux".into(), "1.0.0".into());
        let cancel = CancellationToken::new();
        reporter
            .report(
                &cancel,
                1,
                "already accepted",
                None,
                Severity::Critical,
                ErrorCategory::AcceptTask,
            )
            .await;
        let submitted = fake.submitted_errors();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].severity, "info");
    }

    #[tokio::test]
    async fn auth_failures_are_never_submitted_upstream() {
        let fake = Arc::new(FakeApiClient::new());
        let reporter = ErrorReporter::new(fake.clone(), "linux".into(), "1.0.0".into());
        let cancel = CancellationToken::new();
        reporter
            .report(
                &cancel,
                1,
                "401 unauthorized",
                None,
                Severity::Critical,
                ErrorCategory::Auth,
            )
            .await;
        assert!(fake.submitted_errors().is_empty());
    }

    #[tokio::test]
    async fn reporter_failure_does_not_panic_or_recurse() {
        let fake = Arc::new(FakeApiClient::new().failing_submit_error());
        let reporter = ErrorReporter::new(fake.clone(), "linux".into(), "1.0.0".into());
        let cancel = CancellationToken::new();
        reporter
            .report(
                &cancel,
                1,
                "boom",
                None,
                Severity::Critical,
                ErrorCategory::Generic,
            )
            .await;
    }
}
