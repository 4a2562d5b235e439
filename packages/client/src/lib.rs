#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Clients for the services a territory draft depends on.
//!
//! Three collaborator traits sit at the seam between the draft engine and
//! the backend:
//!
//! - [`OverlapValidator`]: checks a candidate boundary against every
//!   existing territory and reports buildings already claimed elsewhere.
//! - [`BuildingDetector`]: proposes addressable buildings inside a
//!   boundary. Best-effort, never retried.
//! - [`TerritoryRepository`]: creates and updates persisted territories.
//!
//! [`http::HttpTerritoryApi`] implements all three against the REST API
//! configured in [`config::ApiConfig`]. Tests substitute in-memory fakes.

pub mod api;
pub mod config;
pub mod http;
pub mod retry;

use async_trait::async_trait;
use canvass_territory_models::{BuildingDetection, Point, Territory};
use thiserror::Error;

use crate::api::{OverlapCheckRequest, OverlapCheckResponse, TerritoryRequest};

/// Errors from collaborator calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Status code.
        status: u16,
        /// Short description or response excerpt.
        message: String,
    },

    /// A boundary in a response could not be read.
    #[error("Boundary error: {0}")]
    Geometry(#[from] canvass_geometry::GeometryError),

    /// Configuration could not be loaded.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

/// Checks candidate boundaries against existing territories.
#[async_trait]
pub trait OverlapValidator: Send + Sync {
    /// Reports overlap with other territories and duplicate buildings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the service cannot be reached or its
    /// response cannot be parsed.
    async fn check_overlap(
        &self,
        request: &OverlapCheckRequest,
    ) -> Result<OverlapCheckResponse, ClientError>;
}

/// Proposes addressable buildings inside a boundary.
#[async_trait]
pub trait BuildingDetector: Send + Sync {
    /// Looks up buildings inside the normalized (open) `polygon`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the lookup fails.
    async fn detect_buildings(&self, polygon: &[Point]) -> Result<BuildingDetection, ClientError>;
}

/// Persists territories.
#[async_trait]
pub trait TerritoryRepository: Send + Sync {
    /// Creates a new territory and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or is rejected.
    async fn create_territory(&self, request: &TerritoryRequest) -> Result<Territory, ClientError>;

    /// Updates territory `id` and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or is rejected.
    async fn update_territory(
        &self,
        id: &str,
        request: &TerritoryRequest,
    ) -> Result<Territory, ClientError>;
}
