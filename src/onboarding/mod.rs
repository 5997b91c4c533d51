//! Seller onboarding workflow engine.
//!
//! A seller moves through seven steps across three levels. The step catalog
//! describes each one, the executor submits it, and the workflow owns the
//! position, the session issued by the first step and the email verification
//! gate that sits between the first and second steps.

pub mod catalog;
pub mod executor;
pub mod model;
pub mod progress;
pub mod routes;
pub mod session;
pub mod state;
pub mod verification;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{StepDescriptor, StepPayload, StepSummary, describe};
pub use executor::{AdvanceSignal, StepExecutor};
pub use model::{FieldId, OnboardingForm, OnboardingSession, StepForm};
pub use progress::{ProgressSnapshot, StepKey, resolve};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use session::{MemorySessionStore, SessionStore, SettingsSessionStore};
pub use state::{StepPosition, WorkflowController, WorkflowStatus};
pub use verification::{GateState, VerificationGate, VerificationState};
pub use workflow::{OnboardingWorkflow, StepReport, WorkflowSnapshot};
