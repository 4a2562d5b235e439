//! The territory draft state machine.
//!
//! All workflow state lives behind one mutex that is never held across an
//! `.await`. Each async operation runs in three phases: check and capture
//! under the lock, call collaborators without it, then re-take the lock
//! and apply the response only if the generation token captured in the
//! first phase is still current.

use std::sync::{Arc, Mutex, MutexGuard};

use canvass_client::api::OverlapCheckRequest;
use canvass_geometry::{MIN_VERTICES, normalize, same_shape};
use canvass_residents::{ResidentStore, TerritoryStore};
use canvass_territory_models::{
    LocationSelection, PendingTerritory, Point, Territory, WorkflowStep,
};
use serde::Serialize;

use crate::reconcile::{Reconciler, SaveRequest};
use crate::validation::{OverlapFindings, VALIDATION_FAILED_MESSAGE, merge_residents};
use crate::{CallError, Collaborators, DraftError, EngineConfig, with_timeout};

/// Caller's answer to a destructive-action prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The agent confirmed.
    Confirmed,
    /// The agent backed out, or was never asked.
    Unconfirmed,
}

/// Name, description, and location entered for the territory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryForm {
    /// Territory name.
    pub name: String,
    /// Territory description.
    pub description: String,
    /// Area / municipality / community.
    pub location: LocationSelection,
}

/// Result of [`DraftMachine::complete_shape`] and
/// [`DraftMachine::edit_existing`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The shape was accepted; the machine is now in `saving`.
    Ready {
        /// The new pending territory.
        pending: PendingTerritory,
        /// Whether the previous review was reused without calling any
        /// collaborator.
        reused: bool,
    },
    /// The shape overlaps another territory; the machine stays in
    /// `drawing`.
    Rejected {
        /// Blocking errors.
        errors: Vec<String>,
    },
    /// A collaborator failed or timed out; the machine is back in
    /// `drawing` without a pending territory.
    Failed {
        /// User-facing message.
        message: String,
    },
    /// The drawing changed while the call was in flight; nothing was
    /// applied.
    Discarded,
}

/// Result of [`DraftMachine::save`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// A new territory was created; the machine has been reset.
    Created(Territory),
    /// An existing territory was updated; the machine stays in `saving`.
    Updated(Territory),
    /// The save failed; the machine stays in `saving` for a retry.
    Failed {
        /// User-facing message.
        message: String,
    },
    /// The workflow moved on while the call was in flight.
    Discarded,
}

/// Everything the UI shows, captured at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    /// Current step.
    pub step: WorkflowStep,
    /// Vertices placed so far.
    pub drawing: Vec<Point>,
    /// Whether the agent has placed a vertex.
    pub has_started: bool,
    /// Last reviewed territory.
    pub pending: Option<PendingTerritory>,
    /// Blocking validation errors.
    pub validation_errors: Vec<String>,
    /// Non-blocking validation warnings.
    pub validation_warnings: Vec<String>,
    /// Alert for input errors and collaborator failures.
    pub error_message: Option<String>,
    /// Form fields.
    pub form: TerritoryForm,
    /// Territory being edited, if any.
    pub editing_territory_id: Option<String>,
    /// Whether a validation is outstanding.
    pub is_validating: bool,
    /// Whether a save is outstanding.
    pub is_saving: bool,
    /// Current generation token.
    pub generation: u64,
}

#[derive(Debug, Default)]
struct DraftState {
    step: WorkflowStep,
    drawing: Vec<Point>,
    has_started: bool,
    pending: Option<PendingTerritory>,
    validation_errors: Vec<String>,
    validation_warnings: Vec<String>,
    error_message: Option<String>,
    form: TerritoryForm,
    /// Persisted territory being edited; `None` in create mode.
    original: Option<Territory>,
    generation: u64,
    validating: Option<u64>,
    saving: Option<u64>,
}

impl DraftState {
    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn reject(&mut self, error: DraftError) -> DraftError {
        self.error_message = Some(error.to_string());
        error
    }

    fn ensure_idle(&mut self) -> Result<(), DraftError> {
        if self.saving.is_some() {
            return Err(self.reject(DraftError::SaveInProgress));
        }
        if self.validating.is_some() {
            return Err(self.reject(DraftError::ValidationInProgress));
        }
        Ok(())
    }

    fn ensure_drawing(&mut self) -> Result<(), DraftError> {
        self.ensure_idle()?;
        if self.step != WorkflowStep::Drawing {
            return Err(self.reject(DraftError::NotDrawing));
        }
        Ok(())
    }

    /// First phase of validation, under the lock.
    ///
    /// Returns `Err(outcome)` when the review cache answers the request
    /// directly.
    fn begin_validation(&mut self) -> Result<ValidationTicket, ValidationOutcome> {
        let polygon = normalize(&self.drawing);
        let token = self.bump();
        self.error_message = None;

        if let Some(cached) = self
            .pending
            .as_ref()
            .filter(|p| same_shape(&p.polygon, &polygon))
        {
            let pending = PendingTerritory {
                polygon,
                ..cached.clone()
            };
            log::debug!(
                "Shape unchanged since last review; reusing {} resident(s)",
                pending.residents.len()
            );
            self.validation_errors.clear();
            self.pending = Some(pending.clone());
            self.step = WorkflowStep::Saving;
            return Err(ValidationOutcome::Ready {
                pending,
                reused: true,
            });
        }

        self.validating = Some(token);
        Ok(ValidationTicket {
            token,
            polygon,
            exclude_zone_id: self.original.as_ref().map(|t| t.id.clone()),
        })
    }

    /// Back to an empty drawing, keeping only the generation counter.
    fn reset(&mut self) {
        let generation = self.generation;
        *self = Self {
            generation,
            ..Self::default()
        };
        self.bump();
    }
}

/// Work captured under the lock for an outstanding validation.
struct ValidationTicket {
    token: u64,
    polygon: Vec<Point>,
    exclude_zone_id: Option<String>,
}

enum Checked {
    Accepted {
        pending: PendingTerritory,
        warnings: Vec<String>,
    },
    Rejected(OverlapFindings),
}

/// Territory drawing and review workflow.
///
/// Shared between UI handlers through `Arc`; every method takes `&self`.
pub struct DraftMachine {
    state: Mutex<DraftState>,
    collaborators: Collaborators,
    residents: Arc<ResidentStore>,
    reconciler: Reconciler,
    config: EngineConfig,
}

impl DraftMachine {
    /// Creates a machine in the empty `drawing` step.
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        residents: Arc<ResidentStore>,
        territories: Arc<TerritoryStore>,
        config: EngineConfig,
    ) -> Self {
        let reconciler = Reconciler::new(
            collaborators.repository.clone(),
            residents.clone(),
            territories,
        );
        Self {
            state: Mutex::new(DraftState::default()),
            collaborators,
            residents,
            reconciler,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, DraftState> {
        self.state.lock().expect("draft state mutex poisoned")
    }

    /// Captures the user-visible state.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> DraftSnapshot {
        let state = self.lock();
        DraftSnapshot {
            step: state.step,
            drawing: state.drawing.clone(),
            has_started: state.has_started,
            pending: state.pending.clone(),
            validation_errors: state.validation_errors.clone(),
            validation_warnings: state.validation_warnings.clone(),
            error_message: state.error_message.clone(),
            form: state.form.clone(),
            editing_territory_id: state.original.as_ref().map(|t| t.id.clone()),
            is_validating: state.validating.is_some(),
            is_saving: state.saving.is_some(),
            generation: state.generation,
        }
    }

    /// Appends a vertex to the drawing.
    ///
    /// # Errors
    ///
    /// Fails if the machine is not drawing or a call is in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub fn add_vertex(&self, point: Point) -> Result<(), DraftError> {
        let mut state = self.lock();
        state.ensure_drawing()?;
        state.drawing.push(point);
        state.has_started = true;
        state.error_message = None;
        state.bump();
        Ok(())
    }

    /// Removes the last vertex and returns it.
    ///
    /// Returns `Ok(None)` when the drawing is already empty.
    ///
    /// # Errors
    ///
    /// Fails if the machine is not drawing or a call is in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub fn undo_vertex(&self) -> Result<Option<Point>, DraftError> {
        let mut state = self.lock();
        state.ensure_drawing()?;
        let removed = state.drawing.pop();
        if state.drawing.is_empty() {
            state.has_started = false;
        }
        if removed.is_some() {
            state.bump();
        }
        Ok(removed)
    }

    /// Discards the drawing, the pending territory, and all form fields.
    ///
    /// Any validation still in flight is invalidated. Edit mode, if
    /// active, is kept: the agent is re-drawing the same territory.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if not confirmed, or if a save is
    /// in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub fn clear_drawing(&self, confirmation: Confirmation) -> Result<(), DraftError> {
        let mut state = self.lock();
        if confirmation != Confirmation::Confirmed {
            return Err(state.reject(DraftError::ConfirmationRequired));
        }
        if state.saving.is_some() {
            return Err(state.reject(DraftError::SaveInProgress));
        }
        let original = state.original.take();
        state.reset();
        state.original = original;
        log::debug!("Drawing cleared (generation {})", state.generation);
        Ok(())
    }

    /// Leaves edit mode (if any) and returns to an empty drawing.
    ///
    /// # Errors
    ///
    /// Fails if a save is in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub fn cancel(&self) -> Result<(), DraftError> {
        let mut state = self.lock();
        if state.saving.is_some() {
            return Err(state.reject(DraftError::SaveInProgress));
        }
        state.reset();
        Ok(())
    }

    /// Sets the territory name.
    ///
    /// # Errors
    ///
    /// Fails if a save is in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub fn set_name(&self, name: impl Into<String>) -> Result<(), DraftError> {
        let mut state = self.lock();
        if state.saving.is_some() {
            return Err(state.reject(DraftError::SaveInProgress));
        }
        state.form.name = name.into();
        Ok(())
    }

    /// Sets the territory description.
    ///
    /// # Errors
    ///
    /// Fails if a save is in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub fn set_description(&self, description: impl Into<String>) -> Result<(), DraftError> {
        let mut state = self.lock();
        if state.saving.is_some() {
            return Err(state.reject(DraftError::SaveInProgress));
        }
        state.form.description = description.into();
        Ok(())
    }

    /// Sets the area / municipality / community selection.
    ///
    /// # Errors
    ///
    /// Fails if a save is in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub fn set_location(&self, location: LocationSelection) -> Result<(), DraftError> {
        let mut state = self.lock();
        if state.saving.is_some() {
            return Err(state.reject(DraftError::SaveInProgress));
        }
        state.form.location = location;
        Ok(())
    }

    /// Opens a persisted territory for editing.
    ///
    /// The stored boundary becomes both the drawing and the reviewed
    /// pending territory, so re-completing an untouched shape makes no
    /// collaborator calls.
    ///
    /// # Errors
    ///
    /// Fails if a call is in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub fn open_territory(&self, territory: Territory) -> Result<(), DraftError> {
        let residents = self
            .residents
            .get_many(territory.resident_ids.iter().map(String::as_str));

        let mut state = self.lock();
        state.ensure_idle()?;
        state.reset();

        let polygon = normalize(&territory.boundary);
        state.drawing.clone_from(&polygon);
        state.has_started = !polygon.is_empty();
        state.pending = Some(PendingTerritory {
            polygon,
            residents,
            duplicate_addresses: Vec::new(),
            detected_buildings: Vec::new(),
        });
        state.form = TerritoryForm {
            name: territory.name.clone(),
            description: territory.description.clone(),
            location: territory.location_selection(),
        };
        state.step = WorkflowStep::Saving;
        log::info!("Editing territory {} ({:?})", territory.id, territory.name);
        state.original = Some(territory);
        Ok(())
    }

    /// Returns from review to drawing so the agent can adjust the shape.
    ///
    /// The pending territory is kept as the review cache.
    ///
    /// # Errors
    ///
    /// Fails if not in `saving` or a call is in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub fn resume_drawing(&self) -> Result<(), DraftError> {
        let mut state = self.lock();
        state.ensure_idle()?;
        if state.step != WorkflowStep::Saving {
            return Err(state.reject(DraftError::NotReviewing));
        }
        if let Some(polygon) = state.pending.as_ref().map(|p| p.polygon.clone()) {
            state.drawing = polygon;
        }
        state.has_started = !state.drawing.is_empty();
        state.step = WorkflowStep::Drawing;
        state.bump();
        Ok(())
    }

    /// Validates the current drawing.
    ///
    /// # Errors
    ///
    /// Returns an input error, without calling any collaborator, if fewer
    /// than three vertices are placed, the machine is not drawing, or a
    /// call is already in flight. Collaborator failures are not errors:
    /// they come back as [`ValidationOutcome::Failed`].
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub async fn complete_shape(&self) -> Result<ValidationOutcome, DraftError> {
        let ticket = {
            let mut state = self.lock();
            state.ensure_drawing()?;
            let count = normalize(&state.drawing).len();
            if count < MIN_VERTICES {
                return Err(state.reject(DraftError::TooFewVertices { count }));
            }
            match state.begin_validation() {
                Ok(ticket) => ticket,
                Err(outcome) => return Ok(outcome),
            }
        };

        Ok(self.run_validation(ticket).await)
    }

    /// Re-opens `polygon` for review in edit mode.
    ///
    /// Replaces the drawing with `polygon` and validates it. When the
    /// polygon matches the last reviewed one, the previous residents and
    /// buildings are reused without calling any collaborator.
    ///
    /// # Errors
    ///
    /// Returns an input error if `polygon` has fewer than three distinct
    /// vertices or a call is already in flight.
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub async fn edit_existing(&self, polygon: &[Point]) -> Result<ValidationOutcome, DraftError> {
        let ticket = {
            let mut state = self.lock();
            state.ensure_idle()?;
            let polygon = normalize(polygon);
            if polygon.len() < MIN_VERTICES {
                return Err(state.reject(DraftError::TooFewVertices {
                    count: polygon.len(),
                }));
            }
            state.drawing = polygon;
            state.has_started = true;
            state.step = WorkflowStep::Drawing;
            match state.begin_validation() {
                Ok(ticket) => ticket,
                Err(outcome) => return Ok(outcome),
            }
        };

        Ok(self.run_validation(ticket).await)
    }

    async fn run_validation(&self, ticket: ValidationTicket) -> ValidationOutcome {
        let result = self.check(&ticket).await;

        let mut state = self.lock();
        if state.generation != ticket.token {
            log::debug!(
                "Discarding validation for generation {} (now {})",
                ticket.token,
                state.generation
            );
            return ValidationOutcome::Discarded;
        }
        state.validating = None;

        match result {
            Ok(Checked::Accepted { pending, warnings }) => {
                log::info!(
                    "Territory validated: {} vertices, {} resident(s), {} duplicate(s)",
                    pending.polygon.len(),
                    pending.residents.len(),
                    pending.duplicate_addresses.len()
                );
                state.validation_errors.clear();
                state.validation_warnings = warnings;
                state.error_message = None;
                state.pending = Some(pending.clone());
                state.step = WorkflowStep::Saving;
                ValidationOutcome::Ready {
                    pending,
                    reused: false,
                }
            }
            Ok(Checked::Rejected(findings)) => {
                log::info!("Territory rejected: {}", findings.errors.join("; "));
                state.validation_errors.clone_from(&findings.errors);
                state.validation_warnings = findings.warnings;
                state.pending = None;
                state.step = WorkflowStep::Drawing;
                ValidationOutcome::Rejected {
                    errors: findings.errors,
                }
            }
            Err(e) => {
                log::warn!("Territory validation failed: {e}");
                state.validation_errors.clear();
                state.validation_warnings.clear();
                state.error_message = Some(VALIDATION_FAILED_MESSAGE.to_string());
                state.pending = None;
                state.step = WorkflowStep::Drawing;
                ValidationOutcome::Failed {
                    message: VALIDATION_FAILED_MESSAGE.to_string(),
                }
            }
        }
    }

    /// Overlap check, then building detection and resident merge.
    async fn check(&self, ticket: &ValidationTicket) -> Result<Checked, CallError> {
        let timeout = self.config.validation_timeout();
        let known = self.residents.residents_in_polygon(&ticket.polygon);
        let request =
            OverlapCheckRequest::new(&ticket.polygon, &known, ticket.exclude_zone_id.as_deref());

        let overlap = with_timeout(
            "overlap check",
            timeout,
            self.collaborators.overlap.check_overlap(&request),
        )
        .await?;

        let findings = OverlapFindings::from_response(&overlap);
        if findings.is_blocking() {
            return Ok(Checked::Rejected(findings));
        }

        let detection = with_timeout(
            "building detection",
            timeout,
            self.collaborators.detector.detect_buildings(&ticket.polygon),
        )
        .await?;

        let known = self.residents.residents_in_polygon(&ticket.polygon);
        let residents = merge_residents(known, &detection.buildings, &self.residents);

        let mut warnings = findings.warnings;
        warnings.extend(detection.warnings);

        Ok(Checked::Accepted {
            pending: PendingTerritory {
                polygon: ticket.polygon.clone(),
                residents,
                duplicate_addresses: findings.duplicate_addresses,
                detected_buildings: detection.buildings,
            },
            warnings,
        })
    }

    /// Persists the pending territory.
    ///
    /// # Errors
    ///
    /// Returns an input error, without calling any collaborator, if the
    /// name is empty, nothing has been reviewed, the location selection
    /// is incomplete where required, or a call is already in flight.
    /// Repository failures come back as [`SaveOutcome::Failed`].
    ///
    /// # Panics
    ///
    /// Panics if the state mutex is poisoned.
    pub async fn save(&self) -> Result<SaveOutcome, DraftError> {
        let (token, plan, pending) = {
            let mut state = self.lock();
            state.ensure_idle()?;
            let plan = Reconciler::plan(
                state.pending.as_ref(),
                &state.form,
                state.original.as_ref(),
            )
            .map_err(|e| state.reject(e))?;
            if state.step != WorkflowStep::Saving {
                return Err(state.reject(DraftError::NotReviewing));
            }
            let Some(pending) = state.pending.clone() else {
                return Err(state.reject(DraftError::NoPendingTerritory));
            };
            let token = state.generation;
            state.saving = Some(token);
            state.error_message = None;
            (token, plan, pending)
        };

        if let SaveRequest::Update { id, changes, .. } = &plan {
            log::debug!("Updating territory {id}: {changes:?}");
        }

        let result = with_timeout(
            "save",
            self.config.save_timeout(),
            self.reconciler.execute(&plan),
        )
        .await;

        let mut state = self.lock();
        if state.saving == Some(token) {
            state.saving = None;
        }
        if state.generation != token {
            log::debug!("Discarding save response for generation {token}");
            return Ok(SaveOutcome::Discarded);
        }

        match result {
            Ok(saved) => {
                self.reconciler.apply(&saved, &pending);
                if plan.is_create() {
                    state.reset();
                    Ok(SaveOutcome::Created(saved))
                } else {
                    let polygon = saved.boundary.clone();
                    state.drawing.clone_from(&polygon);
                    state.pending = Some(PendingTerritory { polygon, ..pending });
                    state.form.name.clone_from(&saved.name);
                    state.form.description.clone_from(&saved.description);
                    let location = saved.location_selection();
                    if location != LocationSelection::default() {
                        state.form.location = location;
                    }
                    state.validation_errors.clear();
                    state.error_message = None;
                    state.step = WorkflowStep::Saving;
                    state.original = Some(saved.clone());
                    Ok(SaveOutcome::Updated(saved))
                }
            }
            Err(e) => {
                log::error!("Failed to save territory: {e}");
                let cause = match &e {
                    CallError::Client { source, .. } => source.to_string(),
                    CallError::Timeout { .. } => e.to_string(),
                };
                let message = format!("Failed to save territory: {cause}");
                state.error_message = Some(message.clone());
                Ok(SaveOutcome::Failed { message })
            }
        }
    }
}

impl std::fmt::Debug for DraftMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftMachine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
