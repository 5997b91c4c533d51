//! reqwest implementation of the onboarding service client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use super::types::{
    Ack, BusinessDetailsRequest, CategoriesSocialRequest, Envelope, MultipartPayload,
    StartOnboardingRequest, StartedOnboarding, ThemeRequest, VerifyOtpRequest,
};
use super::OnboardingApi;
use crate::error::ApiError;
use crate::onboarding::progress::ProgressSnapshot;

/// HTTP client for the onboarding service.
pub struct HttpOnboardingApi {
    base_url: String,
    auth_token: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpOnboardingApi {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                operation: "client".into(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<Envelope, ApiError> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        self.send(operation, request).await
    }

    async fn post_multipart(
        &self,
        operation: &str,
        path: &str,
        payload: &MultipartPayload,
        token: &str,
    ) -> Result<Envelope, ApiError> {
        let form = build_form(payload).await?;
        let request = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form);
        self.send(operation, request).await
    }

    async fn send(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Envelope, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Transport {
            operation: operation.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Transport {
            operation: operation.to_string(),
            reason: e.to_string(),
        })?;
        debug!(operation, status = %status, "Onboarding service responded");

        let envelope = serde_json::from_str::<Envelope>(&body);
        if status.is_success() {
            return envelope.map_err(|e| ApiError::InvalidResponse {
                operation: operation.to_string(),
                reason: e.to_string(),
            });
        }

        // Client errors that carry a service message are business failures.
        if status.is_client_error()
            && let Ok(env) = envelope
            && let Some(message) = env.message.filter(|m| !m.trim().is_empty())
        {
            return Err(ApiError::Business {
                operation: operation.to_string(),
                message,
            });
        }

        Err(ApiError::Transport {
            operation: operation.to_string(),
            reason: format!("HTTP {status}"),
        })
    }
}

/// Build a multipart form. Absent optional media parts are left out.
async fn build_form(payload: &MultipartPayload) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for (name, value) in &payload.fields {
        form = form.text(*name, value.clone());
    }
    for (name, media) in payload.attached_files() {
        let bytes = tokio::fs::read(&media.path)
            .await
            .map_err(|e| ApiError::Media {
                path: media.path.display().to_string(),
                reason: e.to_string(),
            })?;
        let mut part = Part::bytes(bytes).file_name(media.file_name());
        if let Some(mime) = &media.mime_type {
            part = part.mime_str(mime).map_err(|e| ApiError::Media {
                path: media.path.display().to_string(),
                reason: format!("invalid mime type {mime}: {e}"),
            })?;
        }
        form = form.part(name, part);
    }
    Ok(form)
}

#[async_trait]
impl OnboardingApi for HttpOnboardingApi {
    async fn start_onboarding(
        &self,
        request: &StartOnboardingRequest,
    ) -> Result<StartedOnboarding, ApiError> {
        const OP: &str = "startOnboarding";
        self.post_json(OP, "/onboarding/start", request, None)
            .await?
            .into_started(OP)
    }

    async fn upload_profile_media(
        &self,
        payload: &MultipartPayload,
        token: &str,
    ) -> Result<Ack, ApiError> {
        const OP: &str = "uploadProfileMedia";
        self.post_multipart(OP, "/onboarding/profile-media", payload, token)
            .await?
            .into_ack(OP)
    }

    async fn set_categories_social(
        &self,
        request: &CategoriesSocialRequest,
        token: &str,
    ) -> Result<Ack, ApiError> {
        const OP: &str = "setCategoriesSocial";
        self.post_json(OP, "/onboarding/categories-social", request, Some(token))
            .await?
            .into_ack(OP)
    }

    async fn set_business_details(
        &self,
        request: &BusinessDetailsRequest,
        token: &str,
    ) -> Result<Ack, ApiError> {
        const OP: &str = "setBusinessDetails";
        self.post_json(OP, "/onboarding/business-details", request, Some(token))
            .await?
            .into_ack(OP)
    }

    async fn upload_documents(
        &self,
        payload: &MultipartPayload,
        token: &str,
    ) -> Result<Ack, ApiError> {
        const OP: &str = "uploadDocuments";
        self.post_multipart(OP, "/onboarding/documents", payload, token)
            .await?
            .into_ack(OP)
    }

    async fn upload_physical_store(
        &self,
        payload: &MultipartPayload,
        token: &str,
    ) -> Result<Ack, ApiError> {
        const OP: &str = "uploadPhysicalStore";
        self.post_multipart(OP, "/onboarding/physical-store", payload, token)
            .await?
            .into_ack(OP)
    }

    async fn set_theme(&self, request: &ThemeRequest, token: &str) -> Result<Ack, ApiError> {
        const OP: &str = "setTheme";
        self.post_json(OP, "/onboarding/theme", request, Some(token))
            .await?
            .into_ack(OP)
    }

    async fn submit_onboarding(&self, token: &str) -> Result<Ack, ApiError> {
        const OP: &str = "submitOnboarding";
        self.post_json(OP, "/onboarding/submit", &serde_json::json!({}), Some(token))
            .await?
            .into_ack(OP)
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<Ack, ApiError> {
        const OP: &str = "verifyOtp";
        self.post_json(OP, "/auth/verify-otp", request, None)
            .await?
            .into_ack(OP)
    }

    async fn get_progress(&self) -> Result<ProgressSnapshot, ApiError> {
        const OP: &str = "getProgress";
        let mut request = self.client.get(self.url("/onboarding/progress"));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }
        let envelope = self.send(OP, request).await?;

        // Either `{ steps }` or `{ data: { steps } }`.
        let steps = envelope
            .data
            .as_ref()
            .and_then(|d| d.get("steps").cloned())
            .or(envelope.steps.clone());
        match steps {
            Some(steps) => serde_json::from_value(serde_json::json!({ "steps": steps }))
                .map_err(|e| ApiError::InvalidResponse {
                    operation: OP.to_string(),
                    reason: e.to_string(),
                }),
            None => Err(ApiError::InvalidResponse {
                operation: OP.to_string(),
                reason: "response has no steps".to_string(),
            }),
        }
    }
}
