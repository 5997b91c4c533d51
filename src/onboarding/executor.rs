//! Step executor. Turns a step's form into a remote submission and reports
//! what the workflow should do next.
//!
//! All remote errors are converted into [`StepError`] kinds here; nothing
//! above this layer sees an [`ApiError`](crate::error::ApiError).

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{OnboardingApi, VerifyOtpRequest};
use crate::error::{ApiError, StepError};

use super::catalog::{self, StepPayload, SubmitOutcome};
use super::model::{OnboardingForm, OnboardingSession};
use super::progress::ProgressSnapshot;
use super::state::StepPosition;

/// What a successful submission means for the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceSignal {
    /// The first step created a session; the verification gate opens and the
    /// position stays where it is.
    SessionCreated {
        session: OnboardingSession,
        /// Kept so a resend can repeat exactly what was submitted.
        payload: StepPayload,
        message: String,
    },
    /// Move to the next step.
    Advance { message: String },
    /// The terminal step was accepted.
    Complete { message: String },
}

pub struct StepExecutor {
    api: Arc<dyn OnboardingApi>,
}

impl StepExecutor {
    pub fn new(api: Arc<dyn OnboardingApi>) -> Self {
        Self { api }
    }

    /// Validate, build and submit the step at `position`.
    ///
    /// Validation failures and a missing session return before any network
    /// call.
    pub async fn execute(
        &self,
        position: StepPosition,
        form: &OnboardingForm,
        session: Option<&OnboardingSession>,
    ) -> Result<AdvanceSignal, StepError> {
        let step = catalog::describe(position);
        step.validate(form)?;

        let payload = step.build_payload(form);
        if payload.requires_session() && session.is_none() {
            return Err(StepError::MissingSession);
        }

        debug!(step = %position, operations = ?payload.operations(), "Submitting onboarding step");
        let outcome = catalog::submit(
            self.api.as_ref(),
            &payload,
            session.map(|s| s.token.as_str()),
        )
        .await
        .inspect_err(|e| warn!(step = %position, "Onboarding step failed: {}", e))?;

        let signal = match outcome {
            SubmitOutcome::Started(started) => {
                info!(store_id = %started.store_id, "Store registration started");
                AdvanceSignal::SessionCreated {
                    session: OnboardingSession::new(
                        started.token,
                        started.store_id,
                        form.basic.email.trim(),
                    ),
                    payload,
                    message: started.message,
                }
            }
            SubmitOutcome::Acknowledged(ack) if step.completes_workflow() => {
                AdvanceSignal::Complete {
                    message: ack.message,
                }
            }
            SubmitOutcome::Acknowledged(ack) => AdvanceSignal::Advance {
                message: ack.message,
            },
        };
        info!(step = %position, "Onboarding step accepted");
        Ok(signal)
    }

    /// Repeat the first step's submission to have a new code sent. Returns
    /// the (possibly reissued) session credentials.
    pub async fn resend(&self, payload: &StepPayload) -> Result<(String, String), StepError> {
        match catalog::submit(self.api.as_ref(), payload, None).await? {
            SubmitOutcome::Started(started) => Ok((started.token, started.store_id)),
            SubmitOutcome::Acknowledged(_) => Err(StepError::Transport {
                reason: "resend did not reach the registration endpoint".to_string(),
            }),
        }
    }

    /// Confirm the emailed code. A rejected code is a verification error.
    pub async fn verify(&self, email: &str, otp: &str) -> Result<String, StepError> {
        let request = VerifyOtpRequest {
            email: email.to_string(),
            otp: otp.trim().to_string(),
        };
        match self.api.verify_otp(&request).await {
            Ok(ack) => Ok(ack.message),
            Err(ApiError::Business { message, .. }) => Err(StepError::Verification { message }),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn fetch_progress(&self) -> Result<ProgressSnapshot, StepError> {
        Ok(self.api.get_progress().await?)
    }
}
