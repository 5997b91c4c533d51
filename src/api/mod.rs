//! Remote onboarding service boundary.
//!
//! The workflow only depends on the [`OnboardingApi`] trait.
//! [`HttpOnboardingApi`] is the reqwest implementation used by the binary.

mod http;
pub mod types;

pub use http::HttpOnboardingApi;
pub use types::{
    Ack, BusinessDetailsRequest, CategoriesSocialRequest, Envelope, FilePart, MultipartPayload,
    StartOnboardingRequest, StartedOnboarding, StatusFlag, ThemeRequest, VerifyOtpRequest,
};

use async_trait::async_trait;

use crate::error::ApiError;
use crate::onboarding::progress::ProgressSnapshot;

/// One method per remote onboarding operation.
///
/// Business-rule failures (`status` false) come back as
/// [`ApiError::Business`]; anything that prevented a usable answer is
/// [`ApiError::Transport`] or [`ApiError::InvalidResponse`].
#[async_trait]
pub trait OnboardingApi: Send + Sync {
    /// Create the store registration and send a verification code.
    async fn start_onboarding(
        &self,
        request: &StartOnboardingRequest,
    ) -> Result<StartedOnboarding, ApiError>;

    async fn upload_profile_media(
        &self,
        payload: &MultipartPayload,
        token: &str,
    ) -> Result<Ack, ApiError>;

    async fn set_categories_social(
        &self,
        request: &CategoriesSocialRequest,
        token: &str,
    ) -> Result<Ack, ApiError>;

    async fn set_business_details(
        &self,
        request: &BusinessDetailsRequest,
        token: &str,
    ) -> Result<Ack, ApiError>;

    async fn upload_documents(
        &self,
        payload: &MultipartPayload,
        token: &str,
    ) -> Result<Ack, ApiError>;

    async fn upload_physical_store(
        &self,
        payload: &MultipartPayload,
        token: &str,
    ) -> Result<Ack, ApiError>;

    async fn set_theme(&self, request: &ThemeRequest, token: &str) -> Result<Ack, ApiError>;

    /// Finalize the registration.
    async fn submit_onboarding(&self, token: &str) -> Result<Ack, ApiError>;

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<Ack, ApiError>;

    /// Progress of the signed-in user's store registration.
    async fn get_progress(&self) -> Result<ProgressSnapshot, ApiError>;
}
