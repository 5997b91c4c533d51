//! OnboardingWorkflow coordinates the controller, executor, verification
//! gate and session store for one onboarding attempt.
//!
//! Every operation takes `&self`. Only one remote-backed operation runs at a
//! time; a second one started while the first is pending is rejected with
//! [`StepError::SubmissionInFlight`] rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::OnboardingApi;
use crate::config::WorkflowConfig;
use crate::error::{Inconsistency, StepError};

use super::catalog::{self, StepPayload, StepSummary};
use super::executor::{AdvanceSignal, StepExecutor};
use super::model::{OnboardingForm, OnboardingSession, StepForm};
use super::progress::{self, ProgressSnapshot};
use super::session::SessionStore;
use super::state::{StepPosition, WorkflowController, WorkflowStatus};
use super::verification::{GateState, VerificationGate, VerificationState};

/// Result of an accepted operation, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub position: StepPosition,
    pub status: WorkflowStatus,
    pub gate: GateState,
    /// Service-provided message for the accepted call.
    pub message: String,
}

/// Point-in-time view of the whole workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub attempt_id: Uuid,
    pub position: StepPosition,
    pub status: WorkflowStatus,
    pub verification: VerificationState,
    pub in_flight: bool,
    pub step: StepSummary,
    pub store_id: Option<String>,
    pub inconsistency: Option<Inconsistency>,
}

/// Held for the duration of a remote-backed operation.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, StepError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| StepError::SubmissionInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct OnboardingWorkflow {
    attempt_id: Uuid,
    executor: StepExecutor,
    sessions: Arc<dyn SessionStore>,
    controller: RwLock<WorkflowController>,
    form: RwLock<OnboardingForm>,
    session: RwLock<Option<OnboardingSession>>,
    gate: RwLock<VerificationGate>,
    /// First-step payload kept for resends.
    pending_start: RwLock<Option<StepPayload>>,
    inconsistency: RwLock<Option<Inconsistency>>,
    /// A restored session is waiting for remote progress to be read.
    progress_pending: AtomicBool,
    in_flight: AtomicBool,
}

impl OnboardingWorkflow {
    /// A fresh attempt at (1,1). Call [`start`](Self::start) to pick up a
    /// persisted session and remote progress.
    pub fn new(
        api: Arc<dyn OnboardingApi>,
        sessions: Arc<dyn SessionStore>,
        config: WorkflowConfig,
    ) -> Self {
        let seed_secs = u32::try_from(config.resend_countdown.as_secs()).unwrap_or(u32::MAX);
        Self {
            attempt_id: Uuid::new_v4(),
            executor: StepExecutor::new(api),
            sessions,
            controller: RwLock::new(WorkflowController::default()),
            form: RwLock::new(OnboardingForm::default()),
            session: RwLock::new(None),
            gate: RwLock::new(VerificationGate::new(seed_secs, config.tick_interval)),
            pending_start: RwLock::new(None),
            inconsistency: RwLock::new(None),
            progress_pending: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    /// Load the persisted session, fetch remote progress and seed the
    /// position from it.
    ///
    /// A session that disagrees with remote progress is reported as
    /// [`StepError::StateInconsistency`] and left in place; submissions stay
    /// blocked until [`discard_session`](Self::discard_session) is called.
    ///
    /// If the progress fetch fails, a restored session is still held and
    /// submissions are refused until [`refresh_progress`](Self::refresh_progress)
    /// succeeds.
    pub async fn start(&self) -> Result<StepPosition, StepError> {
        let _busy = InFlight::acquire(&self.in_flight)?;
        self.ensure_in_progress().await?;

        let stored = self.sessions.load().await?;
        if stored.is_some() {
            *self.session.write().await = stored.clone();
            self.progress_pending.store(true, Ordering::SeqCst);
        }
        let snapshot = self.executor.fetch_progress().await?;
        self.reconcile(stored, &snapshot).await
    }

    /// Refetch remote progress and re-seed the position, keeping the session
    /// held in memory, or the stored one when nothing is held.
    pub async fn refresh_progress(&self) -> Result<StepPosition, StepError> {
        let _busy = InFlight::acquire(&self.in_flight)?;
        self.ensure_in_progress().await?;

        let held = self.session.read().await.clone();
        let current = match held {
            Some(session) => Some(session),
            None => self.sessions.load().await?,
        };
        let snapshot = self.executor.fetch_progress().await?;
        self.reconcile(current, &snapshot).await
    }

    async fn reconcile(
        &self,
        session: Option<OnboardingSession>,
        snapshot: &ProgressSnapshot,
    ) -> Result<StepPosition, StepError> {
        self.progress_pending.store(false, Ordering::SeqCst);
        let resume_at = progress::resolve(snapshot);
        let completed = snapshot.completed_count();
        debug!(
            level = resume_at.level(),
            phase = resume_at.phase(),
            completed,
            has_session = session.is_some(),
            "Resolved remote onboarding progress"
        );

        let inconsistency = match (&session, completed) {
            (Some(s), 0) => Some(Inconsistency::StaleSession {
                store_id: s.store_id.clone(),
            }),
            (None, n) if n > 0 => Some(Inconsistency::MissingSession { resume_at }),
            _ => None,
        };

        if let Some(found) = inconsistency {
            warn!("Onboarding state is inconsistent: {}", found);
            self.controller.write().await.reseed(StepPosition::INITIAL);
            self.gate.write().await.reset();
            *self.session.write().await = session;
            *self.inconsistency.write().await = Some(found.clone());
            return Err(found.into());
        }
        *self.inconsistency.write().await = None;

        let position = match &session {
            None => StepPosition::INITIAL,
            // Registered but never verified: back to the gate.
            Some(s) if !s.email_verified => {
                self.gate.write().await.open();
                StepPosition::INITIAL
            }
            Some(_) => {
                self.gate.write().await.confirm();
                resume_at
            }
        };
        if session.is_none() {
            self.gate.write().await.reset();
        }

        self.controller.write().await.reseed(position);
        *self.session.write().await = session;
        info!(level = position.level(), phase = position.phase(), "Onboarding position seeded");
        Ok(position)
    }

    /// Validate and submit the current step.
    ///
    /// Success at (1,1) creates the session and opens the verification gate
    /// without moving; success elsewhere advances one step; success at the
    /// terminal step completes the workflow and releases the session. Any
    /// failure leaves position, form, session and gate untouched.
    pub async fn submit_current(&self) -> Result<StepReport, StepError> {
        let _busy = InFlight::acquire(&self.in_flight)?;
        self.ensure_in_progress().await?;
        self.ensure_consistent().await?;
        if self.progress_pending.load(Ordering::SeqCst) {
            return Err(StepError::ProgressUnknown);
        }
        if self.gate.read().await.is_awaiting_code() {
            return Err(StepError::AwaitingVerification);
        }

        let position = self.controller.read().await.position();
        let form = self.form.read().await.clone();
        let session = self.session.read().await.clone();

        let signal = self
            .executor
            .execute(position, &form, session.as_ref())
            .await?;

        let message = match signal {
            AdvanceSignal::SessionCreated {
                session,
                payload,
                message,
            } => {
                self.persist_session(&session).await;
                *self.session.write().await = Some(session);
                *self.pending_start.write().await = Some(payload);
                self.gate.write().await.open();
                info!("Verification code sent, waiting for confirmation");
                message
            }
            AdvanceSignal::Advance { message } => {
                self.controller.write().await.advance();
                message
            }
            AdvanceSignal::Complete { message } => {
                self.controller.write().await.complete();
                self.release_session().await;
                info!(attempt_id = %self.attempt_id, "Onboarding complete");
                message
            }
        };
        Ok(self.report(message).await)
    }

    /// Confirm the emailed code. On success the gate closes for good and the
    /// workflow moves to (1,2).
    pub async fn verify(&self, otp: &str) -> Result<StepReport, StepError> {
        let _busy = InFlight::acquire(&self.in_flight)?;
        self.ensure_in_progress().await?;
        if !self.gate.read().await.is_awaiting_code() {
            return Err(StepError::NotAwaitingVerification);
        }
        let mut session = self
            .session
            .read()
            .await
            .clone()
            .ok_or(StepError::MissingSession)?;
        if otp.trim().is_empty() {
            return Err(StepError::Verification {
                message: format!("Enter the code sent to {}", session.email),
            });
        }

        let message = self.executor.verify(&session.email, otp).await?;

        session.email_verified = true;
        self.persist_session(&session).await;
        *self.session.write().await = Some(session);
        *self.pending_start.write().await = None;
        self.gate.write().await.confirm();
        self.controller.write().await.advance();
        info!("Email verified");
        Ok(self.report(message).await)
    }

    /// Have a new code sent by repeating the first step's submission. Only
    /// allowed once the countdown has run out; restarts it.
    pub async fn resend_code(&self) -> Result<StepReport, StepError> {
        let _busy = InFlight::acquire(&self.in_flight)?;
        self.ensure_in_progress().await?;
        {
            let gate = self.gate.read().await;
            if !gate.is_awaiting_code() {
                return Err(StepError::NotAwaitingVerification);
            }
            if !gate.can_resend() {
                return Err(StepError::ResendNotReady {
                    remaining_secs: gate.remaining_secs(),
                });
            }
        }

        // After a restart the original payload is gone; rebuild it from the form.
        let payload = match self.pending_start.read().await.clone() {
            Some(payload) => payload,
            None => {
                let form = self.form.read().await;
                let step = catalog::describe(StepPosition::INITIAL);
                step.validate(&form)?;
                step.build_payload(&form)
            }
        };

        let (token, store_id) = self.executor.resend(&payload).await?;

        let updated = {
            let mut guard = self.session.write().await;
            match guard.as_mut() {
                Some(session) => {
                    session.token = token;
                    session.store_id = store_id;
                    session.clone()
                }
                None => {
                    let email = match &payload {
                        StepPayload::Start(request) => request.email.clone(),
                        _ => String::new(),
                    };
                    let session = OnboardingSession::new(token, store_id, email);
                    *guard = Some(session.clone());
                    session
                }
            }
        };
        self.persist_session(&updated).await;
        *self.pending_start.write().await = Some(payload);
        self.gate.write().await.restart_countdown();
        info!(store_id = %updated.store_id, "Verification code resent");
        Ok(self.report("Verification code resent".to_string()).await)
    }

    /// Step back one position. Local only; form records are kept.
    pub async fn retreat(&self) -> Result<StepPosition, StepError> {
        let _busy = InFlight::acquire(&self.in_flight)?;
        self.ensure_in_progress().await?;
        let mut controller = self.controller.write().await;
        if controller.retreat() {
            debug!(
                level = controller.position().level(),
                phase = controller.position().phase(),
                "Moved back one step"
            );
        }
        Ok(controller.position())
    }

    /// Replace one step's form record.
    pub async fn update_form(&self, update: StepForm) {
        let position = update.position();
        self.form.write().await.apply(update);
        debug!(step = %position, "Form updated");
    }

    pub async fn form(&self) -> OnboardingForm {
        self.form.read().await.clone()
    }

    pub async fn position(&self) -> StepPosition {
        self.controller.read().await.position()
    }

    pub async fn workflow_status(&self) -> WorkflowStatus {
        self.controller.read().await.status()
    }

    pub async fn session(&self) -> Option<OnboardingSession> {
        self.session.read().await.clone()
    }

    /// Descriptor of the step at the current position.
    pub async fn current_step(&self) -> StepSummary {
        catalog::describe(self.position().await).summary()
    }

    pub async fn status(&self) -> WorkflowSnapshot {
        let controller = self.controller.read().await.clone();
        WorkflowSnapshot {
            attempt_id: self.attempt_id,
            position: controller.position(),
            status: controller.status(),
            verification: self.gate.read().await.snapshot(),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            step: catalog::describe(controller.position()).summary(),
            store_id: self.session.read().await.as_ref().map(|s| s.store_id.clone()),
            inconsistency: self.inconsistency.read().await.clone(),
        }
    }

    /// Give up on this attempt: stop the gate, forget the session.
    pub async fn abandon(&self) -> Result<(), StepError> {
        let _busy = InFlight::acquire(&self.in_flight)?;
        self.ensure_in_progress().await?;
        self.sessions.clear().await?;
        self.gate.write().await.reset();
        *self.session.write().await = None;
        *self.pending_start.write().await = None;
        *self.inconsistency.write().await = None;
        self.progress_pending.store(false, Ordering::SeqCst);
        self.controller.write().await.abandon();
        info!(attempt_id = %self.attempt_id, "Onboarding abandoned");
        Ok(())
    }

    /// Drop the stored session and start over at (1,1). The way out of a
    /// reported inconsistency.
    pub async fn discard_session(&self) -> Result<StepPosition, StepError> {
        let _busy = InFlight::acquire(&self.in_flight)?;
        self.ensure_in_progress().await?;
        self.sessions.clear().await?;
        self.gate.write().await.reset();
        *self.session.write().await = None;
        *self.pending_start.write().await = None;
        *self.inconsistency.write().await = None;
        self.progress_pending.store(false, Ordering::SeqCst);
        self.controller.write().await.reseed(StepPosition::INITIAL);
        info!("Onboarding session discarded, restarting registration");
        Ok(StepPosition::INITIAL)
    }

    async fn ensure_in_progress(&self) -> Result<(), StepError> {
        let status = self.controller.read().await.status();
        if status.is_terminal() {
            return Err(StepError::Finished { status });
        }
        Ok(())
    }

    async fn ensure_consistent(&self) -> Result<(), StepError> {
        match self.inconsistency.read().await.clone() {
            Some(found) => Err(found.into()),
            None => Ok(()),
        }
    }

    /// The remote side already accepted the step, so a local write failure
    /// is logged and not rolled back.
    async fn persist_session(&self, session: &OnboardingSession) {
        if let Err(e) = self.sessions.save(session).await {
            warn!("Failed to persist onboarding session: {}", e);
        }
    }

    async fn release_session(&self) {
        if let Err(e) = self.sessions.clear().await {
            warn!("Failed to clear onboarding session: {}", e);
        }
        self.gate.write().await.reset();
        *self.session.write().await = None;
        *self.pending_start.write().await = None;
    }

    async fn report(&self, message: String) -> StepReport {
        let controller = self.controller.read().await.clone();
        StepReport {
            position: controller.position(),
            status: controller.status(),
            gate: self.gate.read().await.state(),
            message,
        }
    }
}
