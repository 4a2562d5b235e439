#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resident membership index and the process-wide resident and territory
//! stores.
//!
//! The stores are explicit objects shared through `Arc` rather than
//! globals, so each draft session (and each test) can be handed its own.
//! Only the draft state machine and the persistence reconciler write to
//! them.

pub mod membership;
pub mod store;

pub use membership::filter_in_polygon;
pub use store::{ResidentStore, TerritoryStore};
