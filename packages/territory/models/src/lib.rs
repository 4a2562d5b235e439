#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Territory, resident, and building types shared across the canvass
//! workspace.
//!
//! Coordinates are always held as `(latitude, longitude)` in memory. The
//! `[longitude, latitude]` GIS ordering only exists on the wire and is
//! handled by `canvass_geometry`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A map coordinate in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

impl Point {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns the point as a `[longitude, latitude]` pair.
    #[must_use]
    pub const fn to_lng_lat(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Builds a point from a `[longitude, latitude]` pair.
    #[must_use]
    pub const fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self::new(pair[1], pair[0])
    }
}

/// Canvassing status of a single property.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResidentStatus {
    /// Nobody has knocked yet.
    #[default]
    NotVisited,
    /// Showed interest.
    Interested,
    /// Visited with no particular outcome.
    Visited,
    /// Asked to be called back.
    Callback,
    /// Appointment booked.
    Appointment,
    /// Needs another visit.
    FollowUp,
    /// Declined.
    NotInterested,
    /// Nobody answered the door.
    NotOpened,
}

impl ResidentStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::NotVisited,
            Self::Interested,
            Self::Visited,
            Self::Callback,
            Self::Appointment,
            Self::FollowUp,
            Self::NotInterested,
            Self::NotOpened,
        ]
    }
}

/// An addressable property that an agent can visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resident {
    /// Stable identifier (backend id, or the detected building id).
    pub id: String,
    /// Display address.
    pub address: String,
    /// House number, when known separately from the address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    /// Property location.
    pub location: Point,
    /// Canvassing status.
    #[serde(default)]
    pub status: ResidentStatus,
    /// Owner or occupant name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Free-form agent notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// When an agent last visited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visited: Option<DateTime<Utc>>,
}

impl Resident {
    /// Creates a not-yet-visited resident with no contact details.
    #[must_use]
    pub fn new(id: impl Into<String>, address: impl Into<String>, location: Point) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            house_number: None,
            location,
            status: ResidentStatus::NotVisited,
            owner_name: None,
            phone: None,
            email: None,
            notes: None,
            last_visited: None,
        }
    }
}

impl From<&DetectedBuilding> for Resident {
    fn from(building: &DetectedBuilding) -> Self {
        Self {
            house_number: building.house_number.clone(),
            ..Self::new(
                building.id.clone(),
                building.address.clone(),
                building.location,
            )
        }
    }
}

/// Where a detected building came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BuildingSource {
    /// Address data from an authoritative provider.
    Authoritative,
    /// Heuristically placed or simulated building.
    Simulated,
}

/// A structure proposed by the building detection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedBuilding {
    /// Provider-assigned identifier.
    pub id: String,
    /// Building location.
    pub location: Point,
    /// Street address.
    pub address: String,
    /// House number, if the provider split it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    /// Provenance of this record.
    pub source: BuildingSource,
}

/// Result of a building detection lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingDetection {
    /// Candidate buildings inside the polygon.
    #[serde(default)]
    pub buildings: Vec<DetectedBuilding>,
    /// Non-fatal messages from the provider.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// A validated territory that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTerritory {
    /// Normalized (open) boundary ring.
    pub polygon: Vec<Point>,
    /// Residents inside the boundary, known and newly detected.
    pub residents: Vec<Resident>,
    /// Addresses already claimed by another territory.
    pub duplicate_addresses: Vec<String>,
    /// Raw detection results backing `residents`.
    pub detected_buildings: Vec<DetectedBuilding>,
}

/// Lifecycle status of a persisted territory.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerritoryStatus {
    /// Saved but not yet worked.
    #[default]
    Draft,
    /// Being canvassed.
    Active,
    /// Retired.
    Inactive,
}

/// Who a territory is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Agent identifier.
    pub agent_id: String,
    /// Agent display name.
    pub agent_name: Option<String>,
    /// When the assignment was made.
    pub assigned_at: Option<DateTime<Utc>>,
}

/// A reference to one level of the location hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRef {
    /// Identifier.
    pub id: String,
    /// Display name resolved by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A territory as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Territory {
    /// Server-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Normalized (open) boundary ring.
    pub boundary: Vec<Point>,
    /// Lifecycle status.
    pub status: TerritoryStatus,
    /// Agent assignment, if any.
    pub assignment: Option<Assignment>,
    /// Area the territory belongs to.
    pub area: Option<LocationRef>,
    /// Municipality the territory belongs to.
    pub municipality: Option<LocationRef>,
    /// Community the territory belongs to.
    pub community: Option<LocationRef>,
    /// Residents associated with the territory.
    pub resident_ids: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Territory {
    /// Returns the location selection this territory was saved with.
    #[must_use]
    pub fn location_selection(&self) -> LocationSelection {
        LocationSelection {
            area_id: self.area.as_ref().map(|r| r.id.clone()),
            municipality_id: self.municipality.as_ref().map(|r| r.id.clone()),
            community_id: self.community.as_ref().map(|r| r.id.clone()),
        }
    }
}

/// Area / municipality / community picked by the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSelection {
    /// Selected area.
    pub area_id: Option<String>,
    /// Selected municipality.
    pub municipality_id: Option<String>,
    /// Selected community.
    pub community_id: Option<String>,
}

impl LocationSelection {
    /// Creates a fully populated selection.
    #[must_use]
    pub fn new(
        area_id: impl Into<String>,
        municipality_id: impl Into<String>,
        community_id: impl Into<String>,
    ) -> Self {
        Self {
            area_id: Some(area_id.into()),
            municipality_id: Some(municipality_id.into()),
            community_id: Some(community_id.into()),
        }
    }

    /// Whether all three levels are selected with non-empty ids.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.area_id, &self.municipality_id, &self.community_id]
            .iter()
            .all(|id| id.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Which phase of the territory workflow is active.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStep {
    /// Placing or adjusting vertices.
    #[default]
    Drawing,
    /// Reviewing, naming, and persisting a pending territory.
    Saving,
}
