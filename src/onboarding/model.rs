//! Seller onboarding data models: per-step form records, the onboarding
//! session and the field vocabulary shared by validation and payloads.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::StepPosition;

/// Every form field the workflow knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldId {
    StoreName,
    Email,
    PhoneNumber,
    Country,
    City,
    ReferralCode,
    ProfileImage,
    BannerImage,
    Description,
    CategoryIds,
    SocialLinks,
    BusinessType,
    BusinessName,
    BnNumber,
    CacNumber,
    TaxId,
    IdType,
    IdNumber,
    IdDocument,
    ProofOfAddress,
    Address,
    Landmark,
    StoreVideo,
    StorefrontImage,
    ThemeColor,
}

impl FieldId {
    /// Name used in payloads and error reports.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::StoreName => "storeName",
            Self::Email => "email",
            Self::PhoneNumber => "phoneNumber",
            Self::Country => "country",
            Self::City => "city",
            Self::ReferralCode => "referralCode",
            Self::ProfileImage => "profileImage",
            Self::BannerImage => "bannerImage",
            Self::Description => "description",
            Self::CategoryIds => "categoryIds",
            Self::SocialLinks => "socialLinks",
            Self::BusinessType => "businessType",
            Self::BusinessName => "businessName",
            Self::BnNumber => "bnNumber",
            Self::CacNumber => "cacNumber",
            Self::TaxId => "taxId",
            Self::IdType => "idType",
            Self::IdNumber => "idNumber",
            Self::IdDocument => "idDocument",
            Self::ProofOfAddress => "proofOfAddress",
            Self::Address => "address",
            Self::Landmark => "landmark",
            Self::StoreVideo => "storeVideo",
            Self::StorefrontImage => "storefrontImage",
            Self::ThemeColor => "themeColor",
        }
    }

    /// Human label for inline error reporting.
    pub fn label(&self) -> &'static str {
        match self {
            Self::StoreName => "Store name",
            Self::Email => "Email address",
            Self::PhoneNumber => "Phone number",
            Self::Country => "Country",
            Self::City => "City",
            Self::ReferralCode => "Referral code",
            Self::ProfileImage => "Profile image",
            Self::BannerImage => "Banner image",
            Self::Description => "Store description",
            Self::CategoryIds => "Categories",
            Self::SocialLinks => "Social links",
            Self::BusinessType => "Business type",
            Self::BusinessName => "Registered business name",
            Self::BnNumber => "BN number",
            Self::CacNumber => "CAC number",
            Self::TaxId => "Tax ID",
            Self::IdType => "ID type",
            Self::IdNumber => "ID number",
            Self::IdDocument => "ID document",
            Self::ProofOfAddress => "Proof of address",
            Self::Address => "Store address",
            Self::Landmark => "Landmark",
            Self::StoreVideo => "Store video",
            Self::StorefrontImage => "Storefront image",
            Self::ThemeColor => "Theme color",
        }
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Registration type of the seller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessType {
    /// Registered business name; requires a BN number.
    #[serde(rename = "BN")]
    BusinessName,
    /// Limited liability company; requires a CAC number.
    #[serde(rename = "LTD")]
    Limited,
}

impl BusinessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BusinessName => "BN",
            Self::Limited => "LTD",
        }
    }
}

/// A local media file chosen by the seller, uploaded as a multipart part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// File name sent with the multipart part.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string()
    }
}

/// Level 1, phase 1: store identity and contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BasicInfo {
    pub store_name: String,
    pub email: String,
    pub phone_number: String,
    pub country: String,
    pub city: String,
    pub referral_code: String,
}

/// Level 1, phase 2: profile picture, banner and a short description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileMedia {
    pub profile_image: Option<MediaFile>,
    pub banner_image: Option<MediaFile>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

/// Level 1, phase 3: marketplace categories and social profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoriesSocial {
    pub category_ids: Vec<String>,
    pub social_links: Vec<SocialLink>,
}

/// Level 2, phase 1: business registration details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessDetails {
    pub business_type: Option<BusinessType>,
    pub business_name: String,
    pub bn_number: String,
    pub cac_number: String,
    pub tax_id: String,
}

/// Level 2, phase 2: identity documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Documents {
    pub id_type: String,
    pub id_number: String,
    pub id_document: Option<MediaFile>,
    pub proof_of_address: Option<MediaFile>,
}

/// Level 3, phase 1: the physical store and a short venue video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicalStore {
    pub address: String,
    pub landmark: String,
    pub store_video: Option<MediaFile>,
    pub storefront_image: Option<MediaFile>,
}

/// Level 3, phase 2: storefront theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Branding {
    pub theme_color: String,
}

/// All form records of one onboarding attempt.
///
/// Records are only ever replaced by seller input; navigation never clears
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OnboardingForm {
    pub basic: BasicInfo,
    pub profile_media: ProfileMedia,
    pub categories_social: CategoriesSocial,
    pub business_details: BusinessDetails,
    pub documents: Documents,
    pub physical_store: PhysicalStore,
    pub branding: Branding,
}

impl OnboardingForm {
    /// Replace the record for one step.
    pub fn apply(&mut self, update: StepForm) {
        match update {
            StepForm::Basic(f) => self.basic = f,
            StepForm::ProfileMedia(f) => self.profile_media = f,
            StepForm::CategoriesSocial(f) => self.categories_social = f,
            StepForm::BusinessDetails(f) => self.business_details = f,
            StepForm::Documents(f) => self.documents = f,
            StepForm::PhysicalStore(f) => self.physical_store = f,
            StepForm::Branding(f) => self.branding = f,
        }
    }

    /// Text value of a scalar field. `None` for list and media fields.
    pub fn text(&self, field: FieldId) -> Option<&str> {
        let value = match field {
            FieldId::StoreName => &self.basic.store_name,
            FieldId::Email => &self.basic.email,
            FieldId::PhoneNumber => &self.basic.phone_number,
            FieldId::Country => &self.basic.country,
            FieldId::City => &self.basic.city,
            FieldId::ReferralCode => &self.basic.referral_code,
            FieldId::Description => &self.profile_media.description,
            FieldId::BusinessName => &self.business_details.business_name,
            FieldId::BnNumber => &self.business_details.bn_number,
            FieldId::CacNumber => &self.business_details.cac_number,
            FieldId::TaxId => &self.business_details.tax_id,
            FieldId::IdType => &self.documents.id_type,
            FieldId::IdNumber => &self.documents.id_number,
            FieldId::Address => &self.physical_store.address,
            FieldId::Landmark => &self.physical_store.landmark,
            FieldId::ThemeColor => &self.branding.theme_color,
            FieldId::BusinessType => {
                return self.business_details.business_type.map(|t| t.as_str());
            }
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Whether the field holds a non-empty value.
    pub fn has_value(&self, field: FieldId) -> bool {
        match field {
            FieldId::ProfileImage => self.profile_media.profile_image.is_some(),
            FieldId::BannerImage => self.profile_media.banner_image.is_some(),
            FieldId::CategoryIds => self
                .categories_social
                .category_ids
                .iter()
                .any(|c| !c.trim().is_empty()),
            FieldId::SocialLinks => self
                .categories_social
                .social_links
                .iter()
                .any(|l| !l.url.trim().is_empty()),
            FieldId::IdDocument => self.documents.id_document.is_some(),
            FieldId::ProofOfAddress => self.documents.proof_of_address.is_some(),
            FieldId::StoreVideo => self.physical_store.store_video.is_some(),
            FieldId::StorefrontImage => self.physical_store.storefront_image.is_some(),
            other => self.text(other).is_some_and(|v| !v.trim().is_empty()),
        }
    }
}

/// A replacement for one step's form record, as sent by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", content = "fields", rename_all = "snake_case")]
pub enum StepForm {
    Basic(BasicInfo),
    ProfileMedia(ProfileMedia),
    CategoriesSocial(CategoriesSocial),
    BusinessDetails(BusinessDetails),
    Documents(Documents),
    PhysicalStore(PhysicalStore),
    Branding(Branding),
}

impl StepForm {
    /// The step this record belongs to.
    pub fn position(&self) -> StepPosition {
        let (level, phase) = match self {
            Self::Basic(_) => (1, 1),
            Self::ProfileMedia(_) => (1, 2),
            Self::CategoriesSocial(_) => (1, 3),
            Self::BusinessDetails(_) => (2, 1),
            Self::Documents(_) => (2, 2),
            Self::PhysicalStore(_) => (3, 1),
            Self::Branding(_) => (3, 2),
        };
        StepPosition::new(level, phase).unwrap_or_default()
    }
}

/// The session issued by the first step and attached to every later step.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingSession {
    pub token: String,
    pub store_id: String,
    /// Address the verification code was sent to.
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl OnboardingSession {
    pub fn new(
        token: impl Into<String>,
        store_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            store_id: store_id.into(),
            email: email.into(),
            email_verified: false,
            created_at: Utc::now(),
        }
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for OnboardingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingSession")
            .field("token", &"[REDACTED]")
            .field("store_id", &self.store_id)
            .field("email", &self.email)
            .field("email_verified", &self.email_verified)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Settings keys used for onboarding persistence.
pub mod settings_keys {
    /// Key for the in-progress store registration session.
    pub const ONBOARDING_SESSION: &str = "onboarding_session";
    /// Key for the signed-in user's session. Never written by onboarding.
    pub const AUTH_SESSION: &str = "auth_session";
    /// Default user ID (single-user device).
    pub const DEFAULT_USER: &str = "default";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_are_missing() {
        let mut form = OnboardingForm::default();
        assert!(!form.has_value(FieldId::StoreName));
        form.basic.store_name = "   ".into();
        assert!(!form.has_value(FieldId::StoreName));
        form.basic.store_name = "Ada's Fabrics".into();
        assert!(form.has_value(FieldId::StoreName));
    }

    #[test]
    fn list_and_media_presence() {
        let mut form = OnboardingForm::default();
        form.categories_social.category_ids = vec!["".into()];
        assert!(!form.has_value(FieldId::CategoryIds));
        form.categories_social.category_ids.push("fashion".into());
        assert!(form.has_value(FieldId::CategoryIds));

        assert!(!form.has_value(FieldId::StoreVideo));
        form.physical_store.store_video = Some(MediaFile::new("/tmp/tour.mp4"));
        assert!(form.has_value(FieldId::StoreVideo));
    }

    #[test]
    fn business_type_wire_values() {
        let bn: BusinessType = serde_json::from_str("\"BN\"").unwrap();
        assert_eq!(bn, BusinessType::BusinessName);
        let ltd: BusinessType = serde_json::from_str("\"LTD\"").unwrap();
        assert_eq!(ltd, BusinessType::Limited);
        assert_eq!(serde_json::to_string(&ltd).unwrap(), format!("\"{}\"", ltd.as_str()));

        let mut form = OnboardingForm::default();
        assert!(!form.has_value(FieldId::BusinessType));
        form.business_details.business_type = Some(BusinessType::Limited);
        assert_eq!(form.text(FieldId::BusinessType), Some("LTD"));
    }

    #[test]
    fn apply_replaces_only_one_record() {
        let mut form = OnboardingForm::default();
        form.basic.store_name = "Kept".into();
        form.apply(StepForm::Branding(Branding {
            theme_color: "#112233".into(),
        }));
        assert_eq!(form.branding.theme_color, "#112233");
        assert_eq!(form.basic.store_name, "Kept");
    }

    #[test]
    fn step_form_json_shape() {
        let json = r##"{"step":"business_details","fields":{"businessType":"BN","bnNumber":"BN-1"}}"##;
        let update: StepForm = serde_json::from_str(json).unwrap();
        assert_eq!(update.position(), StepPosition::new(2, 1).unwrap());
        match update {
            StepForm::BusinessDetails(d) => {
                assert_eq!(d.business_type, Some(BusinessType::BusinessName));
                assert_eq!(d.bn_number, "BN-1");
                assert!(d.cac_number.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = OnboardingSession::new("secret-token", "store-9", "a@b.co");
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("store-9"));
    }

    #[test]
    fn media_file_name_from_path() {
        let media = MediaFile::new("/photos/banner.png").with_mime_type("image/png");
        assert_eq!(media.file_name(), "banner.png");
        assert_eq!(media.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn every_field_has_distinct_wire_name() {
        use std::collections::HashSet;
        let fields = [
            FieldId::StoreName, FieldId::Email, FieldId::PhoneNumber, FieldId::Country,
            FieldId::City, FieldId::ReferralCode, FieldId::ProfileImage, FieldId::BannerImage,
            FieldId::Description, FieldId::CategoryIds, FieldId::SocialLinks,
            FieldId::BusinessType, FieldId::BusinessName, FieldId::BnNumber, FieldId::CacNumber,
            FieldId::TaxId, FieldId::IdType, FieldId::IdNumber, FieldId::IdDocument,
            FieldId::ProofOfAddress, FieldId::Address, FieldId::Landmark, FieldId::StoreVideo,
            FieldId::StorefrontImage, FieldId::ThemeColor,
        ];
        let names: HashSet<_> = fields.iter().map(|f| f.wire_name()).collect();
        assert_eq!(names.len(), fields.len());
        for f in fields {
            assert_eq!(serde_json::to_string(&f).unwrap(), format!("\"{}\"", f.wire_name()));
        }
    }
}
