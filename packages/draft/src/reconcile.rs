//! Persistence reconciler.
//!
//! Works out what a save has to send, sends it, and writes the server's
//! answer back into the shared stores. In edit mode the request carries an
//! update hint when only the boundary, or only the name/description,
//! changed. The backend applies different invalidation depending on which
//! hint is set, so a location change or a change to both always goes out
//! as a full update.

use std::sync::Arc;

use canvass_client::api::{TerritoryRequest, UpdateHint};
use canvass_client::{ClientError, TerritoryRepository};
use canvass_geometry::same_shape;
use canvass_residents::{ResidentStore, TerritoryStore};
use canvass_territory_models::{LocationSelection, PendingTerritory, Territory};

use crate::DraftError;
use crate::machine::TerritoryForm;

/// What changed relative to the persisted territory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Boundary differs beyond tolerance.
    pub boundary: bool,
    /// Name or description differs.
    pub metadata: bool,
    /// Area, municipality, or community differs.
    pub location: bool,
}

impl ChangeSet {
    /// Compares a pending save with the persisted `original`.
    #[must_use]
    pub fn between(
        original: &Territory,
        polygon: &[canvass_territory_models::Point],
        name: &str,
        description: &str,
        location: &LocationSelection,
    ) -> Self {
        Self {
            boundary: !same_shape(polygon, &original.boundary),
            metadata: name.trim() != original.name.trim()
                || description.trim() != original.description.trim(),
            location: *location != original.location_selection(),
        }
    }

    /// The update hint these changes allow, if any.
    #[must_use]
    pub const fn hint(self) -> Option<UpdateHint> {
        match (self.boundary, self.metadata, self.location) {
            (true, false, false) => Some(UpdateHint::BoundaryOnly),
            (false, true, false) => Some(UpdateHint::NameDescriptionOnly),
            _ => None,
        }
    }
}

/// A planned save.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveRequest {
    /// New territory.
    Create(TerritoryRequest),
    /// Existing territory `id`.
    Update {
        /// Territory being edited.
        id: String,
        /// Request body.
        request: TerritoryRequest,
        /// Differences that produced the hint.
        changes: ChangeSet,
    },
}

impl SaveRequest {
    /// The request body.
    #[must_use]
    pub const fn request(&self) -> &TerritoryRequest {
        match self {
            Self::Create(request) | Self::Update { request, .. } => request,
        }
    }

    /// Whether this creates a territory.
    #[must_use]
    pub const fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }
}

/// Builds, sends, and applies territory saves.
#[derive(Clone)]
pub struct Reconciler {
    repository: Arc<dyn TerritoryRepository>,
    residents: Arc<ResidentStore>,
    territories: Arc<TerritoryStore>,
}

impl Reconciler {
    /// Creates a reconciler writing to the given stores.
    #[must_use]
    pub fn new(
        repository: Arc<dyn TerritoryRepository>,
        residents: Arc<ResidentStore>,
        territories: Arc<TerritoryStore>,
    ) -> Self {
        Self {
            repository,
            residents,
            territories,
        }
    }

    /// Checks the pre-save guards and plans the request.
    ///
    /// `original` is the persisted territory in edit mode, `None` when
    /// creating.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::MissingName`], [`DraftError::NoPendingTerritory`],
    /// or [`DraftError::IncompleteLocation`], checked in that order. The
    /// location is only required when creating or when an edit changed it.
    pub fn plan(
        pending: Option<&PendingTerritory>,
        form: &TerritoryForm,
        original: Option<&Territory>,
    ) -> Result<SaveRequest, DraftError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }
        let pending = pending.ok_or(DraftError::NoPendingTerritory)?;
        let description = form.description.trim();

        let builder = TerritoryRequest::builder(name, description, &pending.polygon)
            .buildings(&pending.residents)
            .location(form.location.clone());

        let Some(original) = original else {
            if !form.location.is_complete() {
                return Err(DraftError::IncompleteLocation);
            }
            return Ok(SaveRequest::Create(builder.build()));
        };

        let changes = ChangeSet::between(
            original,
            &pending.polygon,
            name,
            description,
            &form.location,
        );
        if changes.location && !form.location.is_complete() {
            return Err(DraftError::IncompleteLocation);
        }

        let request = match changes.hint() {
            Some(hint) => builder.hint(hint).build(),
            None => builder.build(),
        };

        Ok(SaveRequest::Update {
            id: original.id.clone(),
            request,
            changes,
        })
    }

    /// Sends a planned save.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the repository call fails.
    pub async fn execute(&self, save: &SaveRequest) -> Result<Territory, ClientError> {
        match save {
            SaveRequest::Create(request) => self.repository.create_territory(request).await,
            SaveRequest::Update { id, request, .. } => {
                self.repository.update_territory(id, request).await
            }
        }
    }

    /// Writes a saved territory and its residents into the stores.
    ///
    /// Residents already on record are left as they are; only newly
    /// detected ones are added.
    pub fn apply(&self, saved: &Territory, pending: &PendingTerritory) {
        let previous = self.territories.upsert(saved.clone());
        let added = self.residents.insert_missing(pending.residents.iter().cloned());
        log::info!(
            "{} territory {} ({:?}); {added} new resident(s) recorded",
            if previous.is_some() { "Updated" } else { "Stored" },
            saved.id,
            saved.name
        );
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}
