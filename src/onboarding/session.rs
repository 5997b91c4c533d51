//! Session token store. Keeps the onboarding session across restarts.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::DatabaseError;
use crate::store::Database;

use super::model::{OnboardingSession, settings_keys};

/// Durable home of the onboarding session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &OnboardingSession) -> Result<(), DatabaseError>;

    async fn load(&self) -> Result<Option<OnboardingSession>, DatabaseError>;

    /// Forget the session. Clearing an empty store is not an error.
    async fn clear(&self) -> Result<(), DatabaseError>;
}

/// Stores the session in the settings table under its own key, apart from
/// the signed-in user's session.
pub struct SettingsSessionStore {
    db: Arc<dyn Database>,
    user_id: String,
}

impl SettingsSessionStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self::for_user(db, settings_keys::DEFAULT_USER)
    }

    pub fn for_user(db: Arc<dyn Database>, user_id: impl Into<String>) -> Self {
        Self {
            db,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl SessionStore for SettingsSessionStore {
    async fn save(&self, session: &OnboardingSession) -> Result<(), DatabaseError> {
        let value = serde_json::to_value(session)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.db
            .set_setting(&self.user_id, settings_keys::ONBOARDING_SESSION, &value)
            .await?;
        debug!(store_id = %session.store_id, "Onboarding session saved");
        Ok(())
    }

    async fn load(&self) -> Result<Option<OnboardingSession>, DatabaseError> {
        let Some(value) = self
            .db
            .get_setting(&self.user_id, settings_keys::ONBOARDING_SESSION)
            .await?
        else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Ignoring undecodable onboarding session: {}", e);
                Ok(None)
            }
        }
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        let existed = self
            .db
            .delete_setting(&self.user_id, settings_keys::ONBOARDING_SESSION)
            .await?;
        debug!(existed, "Onboarding session cleared");
        Ok(())
    }
}

/// In-process store for tests and embedders without durable storage.
#[derive(Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<OnboardingSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: OnboardingSession) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &OnboardingSession) -> Result<(), DatabaseError> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<OnboardingSession>, DatabaseError> {
        Ok(self.session.read().await.clone())
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        *self.session.write().await = None;
        Ok(())
    }
}
