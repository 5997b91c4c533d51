//! Progress resolver. Maps the service's progress record to a resume
//! position.

use serde::{Deserialize, Serialize};

use super::state::StepPosition;

/// Stable identifiers of the remotely tracked steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKey {
    #[serde(rename = "level1.basic")]
    Basic,
    #[serde(rename = "level1.profile_media")]
    ProfileMedia,
    #[serde(rename = "level1.categories_social")]
    CategoriesSocial,
    #[serde(rename = "level2.business_details")]
    BusinessDetails,
    #[serde(rename = "level2.documents")]
    Documents,
    #[serde(rename = "level3.physical_store")]
    PhysicalStore,
}

/// Resume priority: the first step not done wins.
pub const RESUME_ORDER: [StepKey; 6] = [
    StepKey::Basic,
    StepKey::ProfileMedia,
    StepKey::CategoriesSocial,
    StepKey::BusinessDetails,
    StepKey::Documents,
    StepKey::PhysicalStore,
];

impl StepKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "level1.basic",
            Self::ProfileMedia => "level1.profile_media",
            Self::CategoriesSocial => "level1.categories_social",
            Self::BusinessDetails => "level2.business_details",
            Self::Documents => "level2.documents",
            Self::PhysicalStore => "level3.physical_store",
        }
    }

    /// The step a seller lands on when this is the first unfinished key.
    pub fn position(&self) -> StepPosition {
        let (level, phase) = match self {
            Self::Basic => (1, 1),
            Self::ProfileMedia => (1, 2),
            Self::CategoriesSocial => (1, 3),
            Self::BusinessDetails => (2, 1),
            Self::Documents => (2, 2),
            Self::PhysicalStore => (3, 1),
        };
        StepPosition::new(level, phase).unwrap_or_default()
    }
}

impl std::fmt::Display for StepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step's status as reported remotely: `"done"` or a boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteStatus {
    Flag(bool),
    Text(String),
}

impl RemoteStatus {
    pub fn is_done(&self) -> bool {
        match self {
            Self::Flag(done) => *done,
            Self::Text(s) => s.trim().eq_ignore_ascii_case("done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub key: String,
    pub status: RemoteStatus,
}

/// The service's record of which named steps are finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub steps: Vec<StepRecord>,
}

impl ProgressSnapshot {
    /// Build a snapshot from `(key, done)` pairs.
    pub fn from_flags<'a>(flags: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        Self {
            steps: flags
                .into_iter()
                .map(|(key, done)| StepRecord {
                    key: key.to_string(),
                    status: RemoteStatus::Text(if done { "done" } else { "pending" }.to_string()),
                })
                .collect(),
        }
    }

    /// Whether `key` is reported done. Unlisted keys are not done.
    pub fn is_done(&self, key: StepKey) -> bool {
        self.steps
            .iter()
            .any(|r| r.key == key.as_str() && r.status.is_done())
    }

    /// Number of known steps reported done. Unknown keys are ignored.
    pub fn completed_count(&self) -> usize {
        RESUME_ORDER.iter().filter(|k| self.is_done(**k)).count()
    }
}

/// Position to resume at: the first unfinished step in [`RESUME_ORDER`], or
/// the terminal step when all are done. Pure and idempotent.
pub fn resolve(snapshot: &ProgressSnapshot) -> StepPosition {
    RESUME_ORDER
        .iter()
        .find(|key| !snapshot.is_done(**key))
        .map(|key| key.position())
        .unwrap_or(StepPosition::TERMINAL)
}
