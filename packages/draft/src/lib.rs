#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Territory boundary capture and synchronization.
//!
//! [`DraftMachine`] turns map taps into a validated [`PendingTerritory`]:
//! it checks the shape against existing territories, pulls in detected
//! buildings and known residents, and hands the result to the
//! [`Reconciler`], which decides whether a save is a create, a full
//! update, or a boundary-only / metadata-only update.
//!
//! The workflow is cooperative. Only one validation and one save may be in
//! flight, and every collaborator response is checked against a generation
//! token before it is applied; responses for a drawing that has since
//! changed are dropped.
//!
//! [`PendingTerritory`]: canvass_territory_models::PendingTerritory

pub mod collaborators;
pub mod config;
pub mod machine;
pub mod reconcile;
pub mod validation;

#[cfg(test)]
mod fakes;

use std::time::Duration;

use canvass_client::ClientError;
use thiserror::Error;

pub use collaborators::Collaborators;
pub use config::EngineConfig;
pub use machine::{
    Confirmation, DraftMachine, DraftSnapshot, SaveOutcome, TerritoryForm, ValidationOutcome,
};
pub use reconcile::{ChangeSet, Reconciler, SaveRequest};

/// Input errors, rejected before any collaborator call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// Fewer than three vertices were placed.
    #[error("A territory needs at least 3 points (currently {count}).")]
    TooFewVertices {
        /// Vertices currently placed.
        count: usize,
    },

    /// The operation needs the drawing step.
    #[error("The drawing can only be changed while drawing.")]
    NotDrawing,

    /// The operation needs the saving step.
    #[error("Complete the shape before saving.")]
    NotReviewing,

    /// A validation is already outstanding.
    #[error("The territory is still being validated.")]
    ValidationInProgress,

    /// A save is already outstanding.
    #[error("The territory is still being saved.")]
    SaveInProgress,

    /// A destructive operation was not confirmed.
    #[error("Clearing the drawing must be confirmed.")]
    ConfirmationRequired,

    /// The territory name is empty.
    #[error("Enter a name for the territory.")]
    MissingName,

    /// No validated territory exists yet.
    #[error("There is no reviewed territory to save.")]
    NoPendingTerritory,

    /// Area, municipality, or community is missing.
    #[error("Select an area, municipality, and community before saving.")]
    IncompleteLocation,
}

/// A collaborator call that did not produce a usable response.
#[derive(Debug, Error)]
pub enum CallError {
    /// The collaborator returned an error.
    #[error("{call} failed: {source}")]
    Client {
        /// Which call failed.
        call: &'static str,
        /// Underlying error.
        #[source]
        source: ClientError,
    },

    /// The collaborator did not answer in time.
    #[error("{call} timed out after {after:?}")]
    Timeout {
        /// Which call timed out.
        call: &'static str,
        /// Configured limit.
        after: Duration,
    },
}

/// Awaits a collaborator call with a deadline.
pub(crate) async fn with_timeout<T, F>(
    call: &'static str,
    after: Duration,
    future: F,
) -> Result<T, CallError>
where
    F: std::future::Future<Output = Result<T, ClientError>> + Send,
{
    match tokio::time::timeout(after, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(CallError::Client { call, source }),
        Err(_) => Err(CallError::Timeout { call, after }),
    }
}
