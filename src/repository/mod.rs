//! Risk profile repository seam.
//!
//! Screening reads profiles through this trait; the owning service persists
//! them elsewhere. A missing profile is a normal condition (new users) and
//! scores as neutral.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::UserRiskProfile;
use crate::error::Result;

#[async_trait]
pub trait RiskProfileRepository: Send + Sync {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<UserRiskProfile>>;
}

/// In-memory repository for tests and embedders
pub struct MemoryRiskProfileRepository {
    profiles: DashMap<Uuid, UserRiskProfile>,
}

impl MemoryRiskProfileRepository {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
        }
    }

    pub fn insert(&self, profile: UserRiskProfile) {
        self.profiles.insert(profile.user_id, profile);
    }
}

impl Default for MemoryRiskProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RiskProfileRepository for MemoryRiskProfileRepository {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<UserRiskProfile>> {
        Ok(self.profiles.get(&user_id).map(|p| p.clone()))
    }
}
