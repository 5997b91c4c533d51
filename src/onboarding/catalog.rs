//! Static table of every onboarding step. Each entry holds the step's field
//! rules and payload builder; [`submit`] maps a payload to its remote calls.
//!
//! Adding or reordering steps is an edit to `CATALOG` only.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::api::{
    Ack, BusinessDetailsRequest, CategoriesSocialRequest, MultipartPayload, OnboardingApi,
    StartOnboardingRequest, StartedOnboarding, ThemeRequest,
};
use crate::error::{StepError, ValidationError};

use super::model::{BusinessType, FieldId, OnboardingForm};
use super::progress::StepKey;
use super::state::StepPosition;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));
static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color pattern"));

/// When a field must be filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "businessType", rename_all = "snake_case")]
pub enum Requirement {
    Always,
    Optional,
    /// Required only when the selected business type matches.
    WhenBusinessType(BusinessType),
}

/// Shape a present value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Email,
    HexColor,
}

impl Format {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Email => EMAIL_RE.is_match(value.trim()),
            Self::HexColor => HEX_COLOR_RE.is_match(value.trim()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldRule {
    pub field: FieldId,
    pub requirement: Requirement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
}

const fn required(field: FieldId) -> FieldRule {
    FieldRule {
        field,
        requirement: Requirement::Always,
        format: None,
    }
}

const fn optional(field: FieldId) -> FieldRule {
    FieldRule {
        field,
        requirement: Requirement::Optional,
        format: None,
    }
}

const fn required_when(field: FieldId, business_type: BusinessType) -> FieldRule {
    FieldRule {
        field,
        requirement: Requirement::WhenBusinessType(business_type),
        format: None,
    }
}

const fn formatted(rule: FieldRule, format: Format) -> FieldRule {
    FieldRule {
        format: Some(format),
        ..rule
    }
}

/// A remote call made while submitting a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteOperation {
    StartOnboarding,
    UploadProfileMedia,
    SetCategoriesSocial,
    SetBusinessDetails,
    UploadDocuments,
    UploadPhysicalStore,
    SetTheme,
    SubmitOnboarding,
}

/// Step-specific submission body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPayload {
    Start(StartOnboardingRequest),
    ProfileMedia(MultipartPayload),
    CategoriesSocial(CategoriesSocialRequest),
    BusinessDetails(BusinessDetailsRequest),
    Documents(MultipartPayload),
    PhysicalStore(MultipartPayload),
    /// The branding step also finalizes the registration.
    Theme(ThemeRequest),
}

impl StepPayload {
    /// Remote calls, in order, that submitting this payload makes.
    pub fn operations(&self) -> &'static [RemoteOperation] {
        use RemoteOperation::*;
        match self {
            Self::Start(_) => &[StartOnboarding],
            Self::ProfileMedia(_) => &[UploadProfileMedia],
            Self::CategoriesSocial(_) => &[SetCategoriesSocial],
            Self::BusinessDetails(_) => &[SetBusinessDetails],
            Self::Documents(_) => &[UploadDocuments],
            Self::PhysicalStore(_) => &[UploadPhysicalStore],
            Self::Theme(_) => &[SetTheme, SubmitOnboarding],
        }
    }

    pub fn requires_session(&self) -> bool {
        !matches!(self, Self::Start(_))
    }
}

/// What the service returned for a submitted step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The first step created a store registration.
    Started(StartedOnboarding),
    Acknowledged(Ack),
}

/// Static description of one step.
pub struct StepDescriptor {
    pub position: StepPosition,
    /// Remote progress key, `None` for the branding step which is tracked by
    /// final submission instead.
    pub key: Option<StepKey>,
    pub title: &'static str,
    pub fields: &'static [FieldRule],
    build: fn(&OnboardingForm) -> StepPayload,
}

impl std::fmt::Debug for StepDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("position", &self.position)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl StepDescriptor {
    /// Fields that must be present for this form, after applying conditions.
    pub fn required_fields(&self, form: &OnboardingForm) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|rule| match rule.requirement {
                Requirement::Always => true,
                Requirement::Optional => false,
                Requirement::WhenBusinessType(t) => form.business_details.business_type == Some(t),
            })
            .map(|rule| rule.field)
            .collect()
    }

    /// Check every rule. Reports all offending fields at once.
    pub fn validate(&self, form: &OnboardingForm) -> Result<(), ValidationError> {
        let missing: Vec<FieldId> = self
            .required_fields(form)
            .into_iter()
            .filter(|f| !form.has_value(*f))
            .collect();
        let invalid: Vec<FieldId> = self
            .fields
            .iter()
            .filter_map(|rule| {
                let format = rule.format?;
                let value = form.text(rule.field)?;
                (!value.trim().is_empty() && !format.accepts(value)).then_some(rule.field)
            })
            .collect();

        if missing.is_empty() && invalid.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                position: self.position,
                missing,
                invalid,
            })
        }
    }

    pub fn build_payload(&self, form: &OnboardingForm) -> StepPayload {
        (self.build)(form)
    }

    pub fn completes_workflow(&self) -> bool {
        self.position.is_terminal()
    }

    pub fn summary(&self) -> StepSummary {
        StepSummary {
            position: self.position,
            key: self.key,
            title: self.title,
            fields: self.fields,
        }
    }
}

/// Serializable view of a descriptor for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub position: StepPosition,
    pub key: Option<StepKey>,
    pub title: &'static str,
    pub fields: &'static [FieldRule],
}

fn pos(level: u8, phase: u8) -> StepPosition {
    StepPosition::new(level, phase).unwrap_or_default()
}

const BASIC_FIELDS: &[FieldRule] = &[
    required(FieldId::StoreName),
    formatted(required(FieldId::Email), Format::Email),
    required(FieldId::PhoneNumber),
    required(FieldId::Country),
    required(FieldId::City),
    optional(FieldId::ReferralCode),
];

const PROFILE_MEDIA_FIELDS: &[FieldRule] = &[
    required(FieldId::ProfileImage),
    required(FieldId::BannerImage),
    optional(FieldId::Description),
];

const CATEGORIES_SOCIAL_FIELDS: &[FieldRule] =
    &[required(FieldId::CategoryIds), optional(FieldId::SocialLinks)];

const BUSINESS_DETAILS_FIELDS: &[FieldRule] = &[
    required(FieldId::BusinessType),
    required(FieldId::BusinessName),
    required_when(FieldId::BnNumber, BusinessType::BusinessName),
    required_when(FieldId::CacNumber, BusinessType::Limited),
    optional(FieldId::TaxId),
];

const DOCUMENTS_FIELDS: &[FieldRule] = &[
    required(FieldId::IdType),
    required(FieldId::IdNumber),
    required(FieldId::IdDocument),
    optional(FieldId::ProofOfAddress),
];

const PHYSICAL_STORE_FIELDS: &[FieldRule] = &[
    required(FieldId::Address),
    optional(FieldId::Landmark),
    required(FieldId::StoreVideo),
    optional(FieldId::StorefrontImage),
];

const BRANDING_FIELDS: &[FieldRule] = &[formatted(required(FieldId::ThemeColor), Format::HexColor)];

static CATALOG: LazyLock<Vec<StepDescriptor>> = LazyLock::new(|| {
    vec![
        StepDescriptor {
            position: pos(1, 1),
            key: Some(StepKey::Basic),
            title: "Store basics",
            fields: BASIC_FIELDS,
            build: build_basic,
        },
        StepDescriptor {
            position: pos(1, 2),
            key: Some(StepKey::ProfileMedia),
            title: "Profile media",
            fields: PROFILE_MEDIA_FIELDS,
            build: build_profile_media,
        },
        StepDescriptor {
            position: pos(1, 3),
            key: Some(StepKey::CategoriesSocial),
            title: "Categories and social links",
            fields: CATEGORIES_SOCIAL_FIELDS,
            build: build_categories_social,
        },
        StepDescriptor {
            position: pos(2, 1),
            key: Some(StepKey::BusinessDetails),
            title: "Business details",
            fields: BUSINESS_DETAILS_FIELDS,
            build: build_business_details,
        },
        StepDescriptor {
            position: pos(2, 2),
            key: Some(StepKey::Documents),
            title: "Identity documents",
            fields: DOCUMENTS_FIELDS,
            build: build_documents,
        },
        StepDescriptor {
            position: pos(3, 1),
            key: Some(StepKey::PhysicalStore),
            title: "Physical store",
            fields: PHYSICAL_STORE_FIELDS,
            build: build_physical_store,
        },
        StepDescriptor {
            position: pos(3, 2),
            key: None,
            title: "Branding",
            fields: BRANDING_FIELDS,
            build: build_branding,
        },
    ]
});

/// Look up the descriptor for a position. Every valid position has one.
pub fn describe(position: StepPosition) -> &'static StepDescriptor {
    CATALOG
        .iter()
        .find(|d| d.position == position)
        .unwrap_or(&CATALOG[0])
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn build_basic(form: &OnboardingForm) -> StepPayload {
    let basic = &form.basic;
    StepPayload::Start(StartOnboardingRequest {
        store_name: basic.store_name.trim().to_string(),
        email: basic.email.trim().to_string(),
        phone_number: basic.phone_number.trim().to_string(),
        country: basic.country.trim().to_string(),
        city: basic.city.trim().to_string(),
        referral_code: non_empty(&basic.referral_code),
    })
}

fn build_profile_media(form: &OnboardingForm) -> StepPayload {
    let media = &form.profile_media;
    StepPayload::ProfileMedia(
        MultipartPayload::default()
            .text_if_present("description", &media.description)
            .file("profileImage", media.profile_image.as_ref())
            .file("bannerImage", media.banner_image.as_ref()),
    )
}

fn build_categories_social(form: &OnboardingForm) -> StepPayload {
    let section = &form.categories_social;
    StepPayload::CategoriesSocial(CategoriesSocialRequest {
        category_ids: section
            .category_ids
            .iter()
            .filter_map(|c| non_empty(c))
            .collect(),
        social_links: section
            .social_links
            .iter()
            .filter(|l| !l.url.trim().is_empty())
            .cloned()
            .collect(),
    })
}

fn build_business_details(form: &OnboardingForm) -> StepPayload {
    let details = &form.business_details;
    let business_type = details.business_type;
    StepPayload::BusinessDetails(BusinessDetailsRequest {
        business_type: business_type.map(|t| t.as_str()).unwrap_or_default().to_string(),
        business_name: details.business_name.trim().to_string(),
        bn_number: non_empty(&details.bn_number)
            .filter(|_| business_type == Some(BusinessType::BusinessName)),
        cac_number: non_empty(&details.cac_number)
            .filter(|_| business_type == Some(BusinessType::Limited)),
        tax_id: non_empty(&details.tax_id),
    })
}

fn build_documents(form: &OnboardingForm) -> StepPayload {
    let docs = &form.documents;
    StepPayload::Documents(
        MultipartPayload::default()
            .text("idType", docs.id_type.trim())
            .text("idNumber", docs.id_number.trim())
            .file("idDocument", docs.id_document.as_ref())
            .file("proofOfAddress", docs.proof_of_address.as_ref()),
    )
}

fn build_physical_store(form: &OnboardingForm) -> StepPayload {
    let store = &form.physical_store;
    StepPayload::PhysicalStore(
        MultipartPayload::default()
            .text("address", store.address.trim())
            .text_if_present("landmark", &store.landmark)
            .file("storeVideo", store.store_video.as_ref())
            .file("storefrontImage", store.storefront_image.as_ref()),
    )
}

fn build_branding(form: &OnboardingForm) -> StepPayload {
    StepPayload::Theme(ThemeRequest {
        theme_color: form.branding.theme_color.trim().to_uppercase(),
    })
}

/// Send a built payload with the remote operations it maps to.
///
/// Every payload except the first step's needs the session token.
pub async fn submit(
    api: &dyn OnboardingApi,
    payload: &StepPayload,
    token: Option<&str>,
) -> Result<SubmitOutcome, StepError> {
    let token = match (payload.requires_session(), token) {
        (true, None) => return Err(StepError::MissingSession),
        (_, token) => token.unwrap_or_default(),
    };

    let ack = match payload {
        StepPayload::Start(request) => {
            return Ok(SubmitOutcome::Started(api.start_onboarding(request).await?));
        }
        StepPayload::ProfileMedia(form) => api.upload_profile_media(form, token).await?,
        StepPayload::CategoriesSocial(request) => api.set_categories_social(request, token).await?,
        StepPayload::BusinessDetails(request) => api.set_business_details(request, token).await?,
        StepPayload::Documents(form) => api.upload_documents(form, token).await?,
        StepPayload::PhysicalStore(form) => api.upload_physical_store(form, token).await?,
        StepPayload::Theme(request) => {
            api.set_theme(request, token).await?;
            api.submit_onboarding(token).await?
        }
    };
    Ok(SubmitOutcome::Acknowledged(ack))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::{MediaFile, SocialLink};

    fn business_form(business_type: BusinessType) -> OnboardingForm {
        let mut form = OnboardingForm::default();
        form.business_details.business_type = Some(business_type);
        form.business_details.business_name = "Ada Fabrics".into();
        form
    }

    #[test]
    fn every_position_has_its_own_descriptor() {
        for position in StepPosition::all() {
            assert_eq!(describe(position).position, position);
        }
        assert_eq!(CATALOG.len(), StepPosition::all().count());
    }

    #[test]
    fn keys_follow_resume_order() {
        let keys: Vec<_> = CATALOG.iter().filter_map(|d| d.key).collect();
        assert_eq!(keys, crate::onboarding::progress::RESUME_ORDER.to_vec());
        for d in CATALOG.iter() {
            if let Some(key) = d.key {
                assert_eq!(key.position(), d.position);
            }
        }
    }

    #[test]
    fn bn_number_required_only_for_bn() {
        let step = describe(pos(2, 1));

        let form = business_form(BusinessType::BusinessName);
        let err = step.validate(&form).unwrap_err();
        assert_eq!(err.missing, vec![FieldId::BnNumber]);

        let mut form = business_form(BusinessType::BusinessName);
        form.business_details.bn_number = "BN-7781".into();
        assert!(step.validate(&form).is_ok());
    }

    #[test]
    fn cac_number_required_only_for_ltd() {
        let step = describe(pos(2, 1));

        let form = business_form(BusinessType::Limited);
        let err = step.validate(&form).unwrap_err();
        assert_eq!(err.missing, vec![FieldId::CacNumber]);

        let mut form = business_form(BusinessType::Limited);
        form.business_details.cac_number = "RC-123456".into();
        assert!(step.validate(&form).is_ok());
    }

    #[test]
    fn unset_business_type_requires_neither_number() {
        let step = describe(pos(2, 1));
        let err = step.validate(&OnboardingForm::default()).unwrap_err();
        assert_eq!(err.missing, vec![FieldId::BusinessType, FieldId::BusinessName]);
    }

    #[test]
    fn basic_step_checks_email_format() {
        let step = describe(StepPosition::INITIAL);
        let mut form = OnboardingForm::default();
        form.basic.store_name = "Ada".into();
        form.basic.email = "not-an-email".into();
        form.basic.phone_number = "+2348000000000".into();
        form.basic.country = "NG".into();
        form.basic.city = "Lagos".into();
        let err = step.validate(&form).unwrap_err();
        assert!(err.missing.is_empty());
        assert_eq!(err.invalid, vec![FieldId::Email]);

        form.basic.email = "ada@fabrics.ng".into();
        assert!(step.validate(&form).is_ok());
    }

    #[test]
    fn branding_requires_hex_color() {
        let step = describe(StepPosition::TERMINAL);
        let mut form = OnboardingForm::default();
        assert_eq!(step.validate(&form).unwrap_err().missing, vec![FieldId::ThemeColor]);
        form.branding.theme_color = "teal".into();
        assert_eq!(step.validate(&form).unwrap_err().invalid, vec![FieldId::ThemeColor]);
        form.branding.theme_color = "#0a9396".into();
        assert!(step.validate(&form).is_ok());
        match step.build_payload(&form) {
            StepPayload::Theme(t) => assert_eq!(t.theme_color, "#0A9396"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn media_required_by_validation_but_optional_in_payload() {
        let step = describe(pos(1, 2));
        let mut form = OnboardingForm::default();
        form.profile_media.profile_image = Some(MediaFile::new("/tmp/p.png"));
        let err = step.validate(&form).unwrap_err();
        assert_eq!(err.missing, vec![FieldId::BannerImage]);

        // The payload still builds, leaving the absent part out.
        match step.build_payload(&form) {
            StepPayload::ProfileMedia(mp) => {
                let names: Vec<_> = mp.attached_files().map(|(n, _)| n).collect();
                assert_eq!(names, vec!["profileImage"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn business_payload_sends_only_matching_number() {
        let mut form = business_form(BusinessType::Limited);
        form.business_details.cac_number = " RC-1 ".into();
        form.business_details.bn_number = "stale BN from an earlier choice".into();
        match describe(pos(2, 1)).build_payload(&form) {
            StepPayload::BusinessDetails(req) => {
                assert_eq!(req.business_type, "LTD");
                assert_eq!(req.cac_number.as_deref(), Some("RC-1"));
                assert_eq!(req.bn_number, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn categories_payload_drops_blank_entries() {
        let mut form = OnboardingForm::default();
        form.categories_social.category_ids = vec!["fashion".into(), " ".into()];
        form.categories_social.social_links = vec![
            SocialLink { platform: "instagram".into(), url: "https://instagram.com/ada".into() },
            SocialLink { platform: "x".into(), url: "".into() },
        ];
        match describe(pos(1, 3)).build_payload(&form) {
            StepPayload::CategoriesSocial(req) => {
                assert_eq!(req.category_ids, vec!["fashion".to_string()]);
                assert_eq!(req.social_links.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_first_and_last_steps_are_special() {
        for d in CATALOG.iter() {
            assert_eq!(d.completes_workflow(), d.position == StepPosition::TERMINAL);
            let payload = d.build_payload(&OnboardingForm::default());
            assert_eq!(payload.requires_session(), d.position != StepPosition::INITIAL);
        }
    }

    #[test]
    fn terminal_payload_also_submits() {
        let payload = describe(StepPosition::TERMINAL).build_payload(&OnboardingForm::default());
        assert_eq!(
            payload.operations(),
            &[RemoteOperation::SetTheme, RemoteOperation::SubmitOnboarding]
        );
    }
}
