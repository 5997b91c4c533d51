//! Request bodies and response envelopes of the onboarding service.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::onboarding::model::{MediaFile, SocialLink};

/// Body of `startOnboarding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOnboardingRequest {
    pub store_name: String,
    pub email: String,
    pub phone_number: String,
    pub country: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoriesSocialRequest {
    pub category_ids: Vec<String>,
    pub social_links: Vec<SocialLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDetailsRequest {
    pub business_type: String,
    pub business_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bn_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cac_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeRequest {
    pub theme_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

/// A file part of a multipart upload. `media: None` means the part is left
/// out of the request entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: &'static str,
    pub media: Option<MediaFile>,
}

/// Scalar fields plus file parts for the media-carrying steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPayload {
    pub fields: Vec<(&'static str, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartPayload {
    pub fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    /// Adds a text field only when the value is non-empty.
    pub fn text_if_present(self, name: &'static str, value: &str) -> Self {
        if value.trim().is_empty() {
            self
        } else {
            self.text(name, value.trim())
        }
    }

    pub fn file(mut self, name: &'static str, media: Option<&MediaFile>) -> Self {
        self.files.push(FilePart {
            name,
            media: media.cloned(),
        });
        self
    }

    /// File parts that will actually be sent.
    pub fn attached_files(&self) -> impl Iterator<Item = (&'static str, &MediaFile)> {
        self.files
            .iter()
            .filter_map(|p| p.media.as_ref().map(|m| (p.name, m)))
    }
}

/// Result of a successful `startOnboarding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedOnboarding {
    pub token: String,
    pub store_id: String,
    pub message: String,
}

/// Acknowledgement for every other successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    pub message: String,
}

/// The service's success flag: a boolean, or a word like `"success"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusFlag {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl StatusFlag {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n == 1 || (200..300).contains(n),
            Self::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "success" | "successful" | "true" | "ok"
            ),
        }
    }
}

/// Common response shape of every onboarding endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<StatusFlag>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, alias = "store_id")]
    pub store_id: Option<serde_json::Value>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Only present on progress responses.
    #[serde(default)]
    pub steps: Option<serde_json::Value>,
}

impl Envelope {
    pub fn message(&self) -> String {
        self.message.clone().unwrap_or_default()
    }

    /// Turn a business-rule failure into an error, pass success through.
    pub fn into_ack(self, operation: &str) -> Result<Ack, ApiError> {
        match &self.status {
            Some(flag) if flag.is_success() => Ok(Ack {
                message: self.message(),
            }),
            Some(_) => Err(ApiError::Business {
                operation: operation.to_string(),
                message: self
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("{operation} was rejected")),
            }),
            None => Err(ApiError::InvalidResponse {
                operation: operation.to_string(),
                reason: "response has no status flag".to_string(),
            }),
        }
    }

    /// Success of `startOnboarding`, which must carry a token and store id,
    /// either at the top level or under `data`.
    pub fn into_started(self, operation: &str) -> Result<StartedOnboarding, ApiError> {
        let nested = self.data.clone().unwrap_or_default();
        let token = self
            .token
            .clone()
            .or_else(|| nested.get("token").and_then(|v| v.as_str()).map(String::from));
        let store_id = self
            .store_id
            .clone()
            .or_else(|| {
                nested
                    .get("storeId")
                    .or_else(|| nested.get("store_id"))
                    .cloned()
            })
            .and_then(id_to_string);
        let ack = self.into_ack(operation)?;

        match (token, store_id) {
            (Some(token), Some(store_id)) if !token.is_empty() => Ok(StartedOnboarding {
                token,
                store_id,
                message: ack.message,
            }),
            _ => Err(ApiError::InvalidResponse {
                operation: operation.to_string(),
                reason: "success response without token and storeId".to_string(),
            }),
        }
    }
}

fn id_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
