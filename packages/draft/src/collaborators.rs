//! The set of external services a draft talks to.

use std::sync::Arc;

use canvass_client::{BuildingDetector, OverlapValidator, TerritoryRepository};

/// Handles to the overlap, detection, and persistence services.
#[derive(Clone)]
pub struct Collaborators {
    /// Overlap / duplicate validation.
    pub overlap: Arc<dyn OverlapValidator>,
    /// Building detection.
    pub detector: Arc<dyn BuildingDetector>,
    /// Create / update.
    pub repository: Arc<dyn TerritoryRepository>,
}

impl Collaborators {
    /// Uses one service for all three roles.
    #[must_use]
    pub fn from_api<T>(api: Arc<T>) -> Self
    where
        T: OverlapValidator + BuildingDetector + TerritoryRepository + 'static,
    {
        Self {
            overlap: api.clone(),
            detector: api.clone(),
            repository: api,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
