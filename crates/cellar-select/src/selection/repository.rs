use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{SubmissionId, WineRecord};
use super::questionnaire::QuestionnaireAnswers;

/// Stored questionnaire answers together with the ranked selection they produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub answers: QuestionnaireAnswers,
    pub selection: Vec<WineRecord>,
    pub submitted_at: DateTime<Utc>,
    /// Address the selection was last mailed to from the results page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
}

/// Key-value storage of submissions by id.
pub trait SubmissionRepository: Send + Sync {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError>;
    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError>;
    fn update_client_email(&self, id: &SubmissionId, email: &str) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("submission already exists")]
    Conflict,
    #[error("submission not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound mail hooks for new submissions and results-page requests.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Internal notice that a questionnaire was completed.
    async fn notify_submission(
        &self,
        answers: &QuestionnaireAnswers,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError>;

    /// Mails the selection to the respondent.
    async fn send_selection(
        &self,
        email: &str,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("mail provider rejected the message: {0}")]
    Rejected(String),
}
