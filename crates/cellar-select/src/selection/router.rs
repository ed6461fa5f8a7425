use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::SubmissionId;
use super::pipeline::SelectionError;
use super::questionnaire::QuestionnaireAnswers;
use super::repository::{Notifier, RepositoryError, SubmissionRepository};
use super::service::{SelectionService, SelectionServiceError};

/// Body of `POST /send-email`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendSelectionRequest {
    pub email: String,
    pub submission_id: String,
}

/// Router exposing questionnaire submission and the results page endpoints.
pub fn selection_router<R, N>(service: Arc<SelectionService<R, N>>) -> Router
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/submit", post(submit_handler::<R, N>))
        .route("/selection/:submission_id", get(selection_handler::<R, N>))
        .route("/send-email", post(send_email_handler::<R, N>))
        .with_state(service)
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<SelectionService<R, N>>>,
    axum::Json(answers): axum::Json<QuestionnaireAnswers>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    match service.submit(answers).await {
        Ok(outcome) => {
            let payload = json!({
                "message": "selection ready",
                "selection": outcome.selection,
                "submission_id": outcome.submission_id,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(SelectionServiceError::Selection(error @ SelectionError::Extraction(_))) => {
            let payload = json!({
                "error": error.user_message(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn selection_handler<R, N>(
    State(service): State<Arc<SelectionService<R, N>>>,
    Path(submission_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let id = SubmissionId(submission_id);
    match service.selection(&id) {
        Ok(selection) => (StatusCode::OK, axum::Json(selection)).into_response(),
        Err(SelectionServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "error": "selection not found",
                "submission_id": id.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn send_email_handler<R, N>(
    State(service): State<Arc<SelectionService<R, N>>>,
    axum::Json(request): axum::Json<SendSelectionRequest>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: Notifier + 'static,
{
    let id = SubmissionId(request.submission_id);
    match service.send_selection(&id, &request.email).await {
        Ok(()) => {
            let payload = json!({
                "message": "selection sent",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(SelectionServiceError::InvalidEmail(_)) => {
            let payload = json!({
                "error": "a valid email address is required",
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(
            SelectionServiceError::Repository(RepositoryError::NotFound)
            | SelectionServiceError::EmptySelection,
        ) => {
            let payload = json!({
                "error": "selection not found",
                "submission_id": id.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(SelectionServiceError::Notification(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
