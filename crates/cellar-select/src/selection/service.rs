use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::domain::{SubmissionId, WineRecord};
use super::pipeline::{SelectionError, SelectionPipeline};
use super::questionnaire::QuestionnaireAnswers;
use super::repository::{
    NotificationError, Notifier, RepositoryError, SubmissionRecord, SubmissionRepository,
};

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub selection: Vec<WineRecord>,
    /// Absent when the selection could not be stored.
    pub submission_id: Option<SubmissionId>,
}

/// Service composing the selection pipeline, submission storage and mail hooks.
pub struct SelectionService<R, N> {
    pipeline: Arc<SelectionPipeline>,
    repository: Arc<R>,
    notifier: Arc<N>,
}

fn next_submission_id() -> SubmissionId {
    SubmissionId(Uuid::new_v4().to_string())
}

impl<R, N> SelectionService<R, N>
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(pipeline: Arc<SelectionPipeline>, repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            pipeline,
            repository,
            notifier,
        }
    }

    pub fn pipeline(&self) -> &SelectionPipeline {
        &self.pipeline
    }

    /// Runs the pipeline, then stores and announces the result.
    ///
    /// Storage and notification failures are logged and never change the outcome.
    pub async fn submit(
        &self,
        answers: QuestionnaireAnswers,
    ) -> Result<SubmissionOutcome, SelectionServiceError> {
        let selection = self.pipeline.select_wines(&answers).await?;

        let record = SubmissionRecord {
            id: next_submission_id(),
            answers,
            selection,
            submitted_at: Utc::now(),
            client_email: None,
        };

        let submission_id = match self.repository.insert(record.clone()) {
            Ok(stored) => {
                info!(submission_id = %stored.id, wines = stored.selection.len(), "submission stored");
                Some(stored.id)
            }
            Err(err) => {
                error!(error = %err, "failed to store submission");
                None
            }
        };

        if let Err(err) = self
            .notifier
            .notify_submission(&record.answers, &record.selection)
            .await
        {
            warn!(error = %err, "submission notification failed");
        }

        Ok(SubmissionOutcome {
            selection: record.selection,
            submission_id,
        })
    }

    /// Stored selection for a submission.
    pub fn selection(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Vec<WineRecord>, SelectionServiceError> {
        let record = self
            .repository
            .fetch(submission_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record.selection)
    }

    /// Records the client's address and mails them the stored selection.
    pub async fn send_selection(
        &self,
        submission_id: &SubmissionId,
        email: &str,
    ) -> Result<(), SelectionServiceError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(SelectionServiceError::InvalidEmail(email.to_string()));
        }

        let selection = self.selection(submission_id)?;
        if selection.is_empty() {
            return Err(SelectionServiceError::EmptySelection);
        }

        self.repository.update_client_email(submission_id, email)?;
        self.notifier.send_selection(email, &selection).await?;
        info!(submission_id = %submission_id, "selection mailed to client");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionServiceError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error("invalid email address `{0}`")]
    InvalidEmail(String),
    #[error("no wines stored for this submission")]
    EmptySelection,
}
