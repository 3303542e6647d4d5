//! Webhook notification of run outcomes.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use qa_core::{Environment, NotificationSettings, NotifyOn, QAReport, RunStatus, Verdict};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(u16),
}

/// Compact JSON body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub run_id: Uuid,
    pub environment: Environment,
    pub status: RunStatus,
    pub verdict: Verdict,
    pub exit_code: i32,
    pub quality_score: f64,
    pub blocking_rules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

impl NotificationPayload {
    pub fn from_report(report: &QAReport) -> Self {
        Self {
            run_id: report.run_id,
            environment: report.environment,
            status: report.status,
            verdict: report.gate.verdict,
            exit_code: report.gate.exit_code,
            quality_score: report.summary.quality_score,
            blocking_rules: report.gate.blocking_rules.clone(),
            abort_reason: report.abort_reason.clone(),
        }
    }
}

/// Whether `settings` asks for a notification about `report`.
pub fn should_notify(settings: &NotificationSettings, report: &QAReport) -> bool {
    match settings.on {
        NotifyOn::Always => true,
        NotifyOn::Failure => !report.gate.is_accepted(),
    }
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(settings: &NotificationSettings) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            url: settings.webhook_url.clone(),
        })
    }

    pub async fn send(&self, report: &QAReport) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&NotificationPayload::from_report(report))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        tracing::debug!(url = %self.url, status = status.as_u16(), "webhook notified");
        Ok(())
    }
}

/// Notify according to `settings`. Failures are logged and swallowed.
pub async fn notify(settings: Option<&NotificationSettings>, report: &QAReport) -> bool {
    let Some(settings) = settings else {
        return false;
    };
    if !should_notify(settings, report) {
        return false;
    }
    let sent = match WebhookNotifier::new(settings) {
        Ok(notifier) => notifier.send(report).await,
        Err(e) => Err(e),
    };
    match sent {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(url = %settings.webhook_url, error = %e, "webhook notification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::{
        AggregatedResult, GateDecision, RejectionThreshold, ReportInput,
    };

    fn report(gate: GateDecision) -> QAReport {
        QAReport::new(ReportInput {
            run_id: Uuid::new_v4(),
            environment: Environment::Ci,
            threshold: RejectionThreshold::CriticalOnly,
            infra: Vec::new(),
            results: AggregatedResult::default(),
            outcomes: Vec::new(),
            gate,
            abort_reason: None,
        })
    }

    fn settings(on: NotifyOn) -> NotificationSettings {
        NotificationSettings {
            webhook_url: "http://127.0.0.1:9/hook".to_string(),
            on,
            timeout_secs: 1,
        }
    }

    #[test]
    fn failure_mode_skips_accepted_runs() {
        let accepted = report(qa_core::decide(&[], RejectionThreshold::CriticalOnly));
        assert!(!should_notify(&settings(NotifyOn::Failure), &accepted));
        assert!(should_notify(&settings(NotifyOn::Always), &accepted));
        assert!(should_notify(&settings(NotifyOn::Failure), &report(GateDecision::aborted())));
    }

    #[test]
    fn payload_shape() {
        let payload = NotificationPayload::from_report(&report(GateDecision::aborted()));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["verdict"], "reject");
        assert_eq!(json["exit_code"], 1);
        assert!(json.get("abort_reason").is_none());
    }

    #[tokio::test]
    async fn unreachable_webhook_is_swallowed() {
        let r = report(GateDecision::aborted());
        assert!(!notify(Some(&settings(NotifyOn::Always)), &r).await);
        assert!(!notify(None, &r).await);
    }
}
