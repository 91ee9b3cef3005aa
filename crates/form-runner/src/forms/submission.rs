use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::answers::Answers;
use super::domain::{ApplicantId, Application, FormId};

/// Outbound delivery of completed applications (queue, e-mail, case system).
pub trait SubmissionPublisher: Send + Sync {
    fn publish(&self, submission: CompletedSubmission) -> Result<(), PublishError>;
}

/// Payload handed to the publisher once an application is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSubmission {
    pub reference: String,
    pub applicant_id: ApplicantId,
    pub form_id: FormId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub answers: Answers,
}

static SUBMISSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

impl CompletedSubmission {
    pub fn from_application(application: &Application, submitted_at: DateTime<Utc>) -> Self {
        let target = application.form.submission.as_ref();
        let prefix = target
            .and_then(|target| target.reference_prefix.as_deref())
            .unwrap_or("SUB");
        let sequence = SUBMISSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);

        Self {
            reference: format!("{prefix}-{sequence:06}"),
            applicant_id: application.applicant_id.clone(),
            form_id: application.form.id.clone(),
            destination: target.map(|target| target.destination.clone()),
            submitted_at,
            answers: application.answers.clone(),
        }
    }
}

/// Submission dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("submission transport unavailable: {0}")]
    Transport(String),
    #[error("submission rejected by {destination}: {reason}")]
    Rejected { destination: String, reason: String },
}

/// Publisher that only records the delivery in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl SubmissionPublisher for LogPublisher {
    fn publish(&self, submission: CompletedSubmission) -> Result<(), PublishError> {
        info!(
            reference = %submission.reference,
            applicant_id = %submission.applicant_id,
            form_id = %submission.form_id,
            destination = submission.destination.as_deref().unwrap_or("none"),
            answers = submission.answers.iter().count(),
            "submission published"
        );
        Ok(())
    }
}
