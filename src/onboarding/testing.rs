//! Scripted `OnboardingApi` for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::{
    Ack, BusinessDetailsRequest, CategoriesSocialRequest, MultipartPayload, OnboardingApi,
    StartOnboardingRequest, StartedOnboarding, ThemeRequest, VerifyOtpRequest,
};
use crate::error::ApiError;

use super::catalog::RemoteOperation;
use super::model::{BusinessType, MediaFile, OnboardingForm, SocialLink};
use super::progress::ProgressSnapshot;

pub const VALID_OTP: &str = "123456";

/// Records every call and answers with success unless a failure was queued
/// for that operation.
#[derive(Default)]
pub struct ScriptedApi {
    calls: Mutex<Vec<(RemoteOperation, Option<String>)>>,
    failures: Mutex<HashMap<RemoteOperation, VecDeque<ApiError>>>,
    verify_calls: Mutex<u32>,
    progress: Mutex<ProgressSnapshot>,
    progress_failure: Mutex<Option<ApiError>>,
    starts: Mutex<u32>,
    hold: Mutex<Option<Hold>>,
}

/// Parks the next call to `op` until released.
struct Hold {
    op: RemoteOperation,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(progress: ProgressSnapshot) -> Self {
        let api = Self::default();
        *api.progress.lock().unwrap() = progress;
        api
    }

    pub fn progress_mut(&self) -> std::sync::MutexGuard<'_, ProgressSnapshot> {
        self.progress.lock().unwrap()
    }

    pub fn fail_next(&self, op: RemoteOperation, err: ApiError) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(err);
    }

    pub fn fail_progress(&self, err: ApiError) {
        *self.progress_failure.lock().unwrap() = Some(err);
    }

    /// Block the next call to `op` once it has been recorded. Returns the
    /// `(entered, release)` pair: `entered` fires when the call arrives and
    /// notifying `release` lets it finish.
    pub fn hold(&self, op: RemoteOperation) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Hold {
            op,
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        });
        (entered, release)
    }

    pub fn calls(&self) -> Vec<RemoteOperation> {
        self.calls.lock().unwrap().iter().map(|(op, _)| *op).collect()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn count(&self, op: RemoteOperation) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    pub fn verify_count(&self) -> u32 {
        *self.verify_calls.lock().unwrap()
    }

    fn record(&self, op: RemoteOperation, token: Option<&str>) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((op, token.map(String::from)));
        match self.failures.lock().unwrap().get_mut(&op).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn pause(&self, op: RemoteOperation) {
        let held = {
            let mut hold = self.hold.lock().unwrap();
            if hold.as_ref().is_some_and(|h| h.op == op) {
                hold.take()
            } else {
                None
            }
        };
        if let Some(held) = held {
            held.entered.notify_one();
            held.release.notified().await;
        }
    }

    async fn ack(&self, op: RemoteOperation, token: &str) -> Result<Ack, ApiError> {
        let recorded = self.record(op, Some(token));
        self.pause(op).await;
        recorded?;
        Ok(Ack {
            message: format!("{op:?} ok"),
        })
    }
}

pub fn business_failure(message: &str) -> ApiError {
    ApiError::Business {
        operation: "test".into(),
        message: message.into(),
    }
}

pub fn transport_failure() -> ApiError {
    ApiError::Transport {
        operation: "test".into(),
        reason: "connection reset".into(),
    }
}

#[async_trait]
impl OnboardingApi for ScriptedApi {
    async fn start_onboarding(
        &self,
        _request: &StartOnboardingRequest,
    ) -> Result<StartedOnboarding, ApiError> {
        let recorded = self.record(RemoteOperation::StartOnboarding, None);
        self.pause(RemoteOperation::StartOnboarding).await;
        recorded?;
        let mut starts = self.starts.lock().unwrap();
        *starts += 1;
        Ok(StartedOnboarding {
            token: format!("token-{}", *starts),
            store_id: "store-1".into(),
            message: "Verification code sent".into(),
        })
    }

    async fn upload_profile_media(
        &self,
        _p: &MultipartPayload,
        token: &str,
    ) -> Result<Ack, ApiError> {
        self.ack(RemoteOperation::UploadProfileMedia, token).await
    }

    async fn set_categories_social(
        &self,
        _r: &CategoriesSocialRequest,
        token: &str,
    ) -> Result<Ack, ApiError> {
        self.ack(RemoteOperation::SetCategoriesSocial, token).await
    }

    async fn set_business_details(
        &self,
        _r: &BusinessDetailsRequest,
        token: &str,
    ) -> Result<Ack, ApiError> {
        self.ack(RemoteOperation::SetBusinessDetails, token).await
    }

    async fn upload_documents(&self, _p: &MultipartPayload, token: &str) -> Result<Ack, ApiError> {
        self.ack(RemoteOperation::UploadDocuments, token).await
    }

    async fn upload_physical_store(
        &self,
        _p: &MultipartPayload,
        token: &str,
    ) -> Result<Ack, ApiError> {
        self.ack(RemoteOperation::UploadPhysicalStore, token).await
    }

    async fn set_theme(&self, _r: &ThemeRequest, token: &str) -> Result<Ack, ApiError> {
        self.ack(RemoteOperation::SetTheme, token).await
    }

    async fn submit_onboarding(&self, token: &str) -> Result<Ack, ApiError> {
        self.ack(RemoteOperation::SubmitOnboarding, token).await
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<Ack, ApiError> {
        *self.verify_calls.lock().unwrap() += 1;
        if request.otp == VALID_OTP {
            Ok(Ack {
                message: "Email verified".into(),
            })
        } else {
            Err(business_failure("Invalid or expired code"))
        }
    }

    async fn get_progress(&self) -> Result<ProgressSnapshot, ApiError> {
        if let Some(err) = self.progress_failure.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.progress.lock().unwrap().clone())
    }
}

/// A form with every step filled in validly, business type LTD.
pub fn complete_form() -> OnboardingForm {
    let mut form = OnboardingForm::default();
    form.basic.store_name = "Ada Fabrics".into();
    form.basic.email = "ada@fabrics.ng".into();
    form.basic.phone_number = "+2348012345678".into();
    form.basic.country = "NG".into();
    form.basic.city = "Lagos".into();
    form.profile_media.profile_image = Some(MediaFile::new("/media/profile.jpg"));
    form.profile_media.banner_image = Some(MediaFile::new("/media/banner.jpg"));
    form.categories_social.category_ids = vec!["fashion".into(), "textiles".into()];
    form.categories_social.social_links = vec![SocialLink {
        platform: "instagram".into(),
        url: "https://instagram.com/adafabrics".into(),
    }];
    form.business_details.business_type = Some(BusinessType::Limited);
    form.business_details.business_name = "Ada Fabrics Ltd".into();
    form.business_details.cac_number = "RC-1234567".into();
    form.documents.id_type = "passport".into();
    form.documents.id_number = "A01234567".into();
    form.documents.id_document = Some(MediaFile::new("/media/passport.pdf"));
    form.physical_store.address = "12 Broad Street, Lagos Island".into();
    form.physical_store.store_video = Some(MediaFile::new("/media/tour.mp4"));
    form.branding.theme_color = "#0A9396".into();
    form
}
