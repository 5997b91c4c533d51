//! REST endpoints that drive the onboarding workflow.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::StepError;

use super::model::StepForm;
use super::workflow::OnboardingWorkflow;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub workflow: Arc<OnboardingWorkflow>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub otp: String,
}

/// A [`StepError`] rendered as an HTTP response.
pub struct ApiFailure(StepError);

impl From<StepError> for ApiFailure {
    fn from(err: StepError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(err: &StepError) -> StatusCode {
    match err {
        StepError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StepError::Verification { .. } => StatusCode::BAD_REQUEST,
        StepError::RemoteBusiness { .. } | StepError::Transport { .. } => StatusCode::BAD_GATEWAY,
        StepError::StateInconsistency(_)
        | StepError::SubmissionInFlight
        | StepError::AwaitingVerification
        | StepError::NotAwaitingVerification
        | StepError::ResendNotReady { .. }
        | StepError::MissingSession
        | StepError::ProgressUnknown
        | StepError::Finished { .. } => StatusCode::CONFLICT,
        StepError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn kind_of(err: &StepError) -> &'static str {
    match err {
        StepError::Validation(_) => "validation",
        StepError::RemoteBusiness { .. } => "remote_business",
        StepError::Transport { .. } => "transport",
        StepError::Verification { .. } => "verification",
        StepError::StateInconsistency(_) => "state_inconsistency",
        StepError::SubmissionInFlight => "submission_in_flight",
        StepError::AwaitingVerification => "awaiting_verification",
        StepError::NotAwaitingVerification => "not_awaiting_verification",
        StepError::ResendNotReady { .. } => "resend_not_ready",
        StepError::MissingSession => "missing_session",
        StepError::ProgressUnknown => "progress_unknown",
        StepError::Finished { .. } => "finished",
        StepError::Storage(_) => "storage",
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let err = self.0;
        let mut body = serde_json::json!({
            "error": err.to_string(),
            "kind": kind_of(&err),
        });
        match &err {
            StepError::Validation(v) => {
                body["missing"] = serde_json::json!(v.missing);
                body["invalid"] = serde_json::json!(v.invalid);
            }
            StepError::StateInconsistency(found) => {
                body["inconsistency"] = serde_json::to_value(found).unwrap_or_default();
            }
            StepError::ResendNotReady { remaining_secs } => {
                body["remainingSecs"] = serde_json::json!(remaining_secs);
            }
            _ => {}
        }
        (status_for(&err), Json(body)).into_response()
    }
}

/// GET /api/onboarding/status
async fn get_status(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.workflow.status().await)
}

/// GET /api/onboarding/step
///
/// Descriptor of the current step: title, fields and their rules.
async fn get_step(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.workflow.current_step().await)
}

/// PUT /api/onboarding/form
///
/// Replaces one step's form record and returns the whole form.
async fn put_form(
    State(state): State<OnboardingRouteState>,
    Json(update): Json<StepForm>,
) -> impl IntoResponse {
    state.workflow.update_form(update).await;
    Json(state.workflow.form().await)
}

/// POST /api/onboarding/submit
async fn submit(State(state): State<OnboardingRouteState>) -> Result<Response, ApiFailure> {
    let report = state.workflow.submit_current().await?;
    Ok(Json(report).into_response())
}

/// POST /api/onboarding/back
async fn back(State(state): State<OnboardingRouteState>) -> Result<Response, ApiFailure> {
    let position = state.workflow.retreat().await?;
    Ok(Json(serde_json::json!({ "position": position })).into_response())
}

/// POST /api/onboarding/verify
async fn verify(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<VerifyBody>,
) -> Result<Response, ApiFailure> {
    let report = state.workflow.verify(&body.otp).await?;
    Ok(Json(report).into_response())
}

/// POST /api/onboarding/resend
async fn resend(State(state): State<OnboardingRouteState>) -> Result<Response, ApiFailure> {
    let report = state.workflow.resend_code().await?;
    Ok(Json(report).into_response())
}

/// POST /api/onboarding/abandon
async fn abandon(State(state): State<OnboardingRouteState>) -> Result<Response, ApiFailure> {
    state.workflow.abandon().await?;
    Ok(Json(state.workflow.status().await).into_response())
}

/// POST /api/onboarding/refresh
async fn refresh(State(state): State<OnboardingRouteState>) -> Result<Response, ApiFailure> {
    let position = state.workflow.refresh_progress().await?;
    Ok(Json(serde_json::json!({ "position": position })).into_response())
}

/// POST /api/onboarding/discard-session
async fn discard_session(
    State(state): State<OnboardingRouteState>,
) -> Result<Response, ApiFailure> {
    let position = state.workflow.discard_session().await?;
    Ok(Json(serde_json::json!({ "position": position })).into_response())
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/step", get(get_step))
        .route("/api/onboarding/form", put(put_form))
        .route("/api/onboarding/submit", post(submit))
        .route("/api/onboarding/back", post(back))
        .route("/api/onboarding/verify", post(verify))
        .route("/api/onboarding/resend", post(resend))
        .route("/api/onboarding/abandon", post(abandon))
        .route("/api/onboarding/refresh", post(refresh))
        .route("/api/onboarding/discard-session", post(discard_session))
        .with_state(state)
}
