//! Wire types for the territory API.
//!
//! Boundaries travel as closed `GeoJSON` polygons in `[lng, lat]` order;
//! building coordinates travel as `[lng, lat]` pairs. Conversion to and
//! from the in-memory `(lat, lng)` [`Point`] happens only here and in
//! `canvass_geometry`.

use canvass_geometry::{GeometryError, boundary_geometry, points_from_geometry};
use canvass_territory_models::{
    Assignment, LocationRef, LocationSelection, Point, Resident, Territory, TerritoryStatus,
};
use chrono::{DateTime, Utc};
use geojson::Geometry;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Addresses and `[lng, lat]` coordinates of the buildings in a boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingData {
    /// Display addresses, index-aligned with `coordinates`.
    pub addresses: Vec<String>,
    /// `[lng, lat]` pairs.
    pub coordinates: Vec<[f64; 2]>,
}

impl BuildingData {
    /// Collects addresses and coordinates from residents.
    #[must_use]
    pub fn from_residents(residents: &[Resident]) -> Self {
        Self {
            addresses: residents.iter().map(|r| r.address.clone()).collect(),
            coordinates: residents.iter().map(|r| r.location.to_lng_lat()).collect(),
        }
    }
}

/// Body of `POST /zones/check-overlap`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapCheckRequest {
    /// Closed candidate boundary.
    pub boundary: Geometry,
    /// Buildings to check for claims by other territories.
    pub building_data: BuildingData,
    /// Territory to leave out of the comparison (edit mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_zone_id: Option<String>,
}

impl OverlapCheckRequest {
    /// Builds a request for `polygon` (open or closed) and the residents
    /// currently known inside it.
    #[must_use]
    pub fn new(polygon: &[Point], residents: &[Resident], exclude_zone_id: Option<&str>) -> Self {
        Self {
            boundary: boundary_geometry(polygon),
            building_data: BuildingData::from_residents(residents),
            exclude_zone_id: exclude_zone_id.map(str::to_string),
        }
    }
}

/// A territory named in an overlap response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRef {
    /// Territory name.
    pub name: String,
    /// Territory id, when the backend includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Response of `POST /zones/check-overlap`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapCheckResponse {
    /// Whether the candidate intersects another territory.
    pub has_overlap: bool,
    /// Territories the candidate intersects.
    #[serde(default)]
    pub overlapping_zones: Option<Vec<ZoneRef>>,
    /// Addresses already claimed by another territory.
    #[serde(default)]
    pub duplicate_buildings: Option<Vec<String>>,
}

impl OverlapCheckResponse {
    /// Names of the overlapping territories (empty when none were given).
    #[must_use]
    pub fn overlapping_names(&self) -> Vec<&str> {
        self.overlapping_zones
            .iter()
            .flatten()
            .map(|z| z.name.as_str())
            .collect()
    }

    /// Duplicate addresses (empty when none were given).
    #[must_use]
    pub fn duplicates(&self) -> &[String] {
        self.duplicate_buildings.as_deref().unwrap_or_default()
    }
}

/// Body of `POST /buildings/detect`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectBuildingsRequest<'a> {
    /// Normalized (open) boundary.
    pub polygon: &'a [Point],
}

/// Which subset of a territory an update touches.
///
/// The backend scopes its invalidation and side effects by this hint, so
/// at most one is ever sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateHint {
    /// Only the boundary changed.
    BoundaryOnly,
    /// Only the name and/or description changed.
    NameDescriptionOnly,
}

impl UpdateHint {
    /// Wire flag set to `true` for this hint.
    #[must_use]
    pub const fn wire_key(self) -> &'static str {
        match self {
            Self::BoundaryOnly => "isBoundaryUpdateOnly",
            Self::NameDescriptionOnly => "isNameDescriptionUpdateOnly",
        }
    }
}

/// Body of `POST /zones` and `PUT /zones/{id}`.
///
/// Built with [`TerritoryRequest::builder`]. Optional parts (building
/// data, location ids, update hint) only appear on the wire when they were
/// attached.
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryRequest {
    name: String,
    description: String,
    boundary: Vec<Point>,
    building_data: Option<BuildingData>,
    location: LocationSelection,
    hint: Option<UpdateHint>,
}

impl TerritoryRequest {
    /// Starts a request with the always-present fields.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        description: impl Into<String>,
        boundary: &[Point],
    ) -> TerritoryRequestBuilder {
        TerritoryRequestBuilder {
            request: Self {
                name: name.into(),
                description: description.into(),
                boundary: canvass_geometry::normalize(boundary),
                building_data: None,
                location: LocationSelection::default(),
                hint: None,
            },
        }
    }

    /// Territory name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Territory description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Normalized (open) boundary.
    #[must_use]
    pub fn boundary(&self) -> &[Point] {
        &self.boundary
    }

    /// Attached building data, if any.
    #[must_use]
    pub const fn building_data(&self) -> Option<&BuildingData> {
        self.building_data.as_ref()
    }

    /// Location ids carried by the request.
    #[must_use]
    pub const fn location(&self) -> &LocationSelection {
        &self.location
    }

    /// Update hint, if any.
    #[must_use]
    pub const fn hint(&self) -> Option<UpdateHint> {
        self.hint
    }
}

impl Serialize for TerritoryRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("description", &self.description)?;
        map.serialize_entry("boundary", &boundary_geometry(&self.boundary))?;
        if let Some(buildings) = &self.building_data {
            map.serialize_entry("buildingData", buildings)?;
        }
        if let Some(id) = &self.location.area_id {
            map.serialize_entry("areaId", id)?;
        }
        if let Some(id) = &self.location.municipality_id {
            map.serialize_entry("municipalityId", id)?;
        }
        if let Some(id) = &self.location.community_id {
            map.serialize_entry("communityId", id)?;
        }
        if let Some(hint) = self.hint {
            map.serialize_entry(hint.wire_key(), &true)?;
        }
        map.end()
    }
}

/// Builder for [`TerritoryRequest`].
#[derive(Debug, Clone)]
pub struct TerritoryRequestBuilder {
    request: TerritoryRequest,
}

impl TerritoryRequestBuilder {
    /// Attaches building data for `residents`; a no-op when empty.
    #[must_use]
    pub fn buildings(mut self, residents: &[Resident]) -> Self {
        if !residents.is_empty() {
            self.request.building_data = Some(BuildingData::from_residents(residents));
        }
        self
    }

    /// Sets the location ids. Missing levels are left off the wire.
    #[must_use]
    pub fn location(mut self, location: LocationSelection) -> Self {
        self.request.location = location;
        self
    }

    /// Sets the update hint.
    #[must_use]
    pub const fn hint(mut self, hint: UpdateHint) -> Self {
        self.request.hint = Some(hint);
        self
    }

    /// Finishes the request.
    #[must_use]
    pub fn build(self) -> TerritoryRequest {
        self.request
    }
}

/// A territory as returned by create/update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTerritory {
    /// Server-assigned id.
    pub id: String,
    /// Name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Closed `[lng, lat]` boundary.
    pub boundary: Geometry,
    /// Lifecycle status.
    #[serde(default)]
    pub status: TerritoryStatus,
    /// Assigned agent id.
    #[serde(default)]
    pub assigned_agent_id: Option<String>,
    /// Assigned agent display name.
    #[serde(default)]
    pub assigned_agent_name: Option<String>,
    /// Assignment time.
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    /// Area, with resolved name.
    #[serde(default)]
    pub area: Option<LocationRef>,
    /// Municipality, with resolved name.
    #[serde(default)]
    pub municipality: Option<LocationRef>,
    /// Community, with resolved name.
    #[serde(default)]
    pub community: Option<LocationRef>,
    /// Associated residents.
    #[serde(default)]
    pub resident_ids: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ApiTerritory> for Territory {
    type Error = GeometryError;

    fn try_from(api: ApiTerritory) -> Result<Self, Self::Error> {
        let boundary = points_from_geometry(&api.boundary)?;
        let assignment = api.assigned_agent_id.map(|agent_id| Assignment {
            agent_id,
            agent_name: api.assigned_agent_name,
            assigned_at: api.assigned_at,
        });

        Ok(Self {
            id: api.id,
            name: api.name,
            description: api.description.unwrap_or_default(),
            boundary,
            status: api.status,
            assignment,
            area: api.area,
            municipality: api.municipality,
            community: api.community,
            resident_ids: api.resident_ids,
            created_at: api.created_at,
            updated_at: api.updated_at,
        })
    }
}

/// Strips an optional `{ "data": ... }` envelope.
#[must_use]
pub fn unwrap_data(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    }
}

/// Parses an overlap check response body.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if the body does not match the schema.
pub fn parse_overlap_response(
    body: serde_json::Value,
) -> Result<OverlapCheckResponse, serde_json::Error> {
    serde_json::from_value(unwrap_data(body))
}

/// Parses a building detection response body.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if the body does not match the schema.
pub fn parse_detection_response(
    body: serde_json::Value,
) -> Result<canvass_territory_models::BuildingDetection, serde_json::Error> {
    serde_json::from_value(unwrap_data(body))
}

/// Parses a create/update response body into a [`Territory`].
///
/// # Errors
///
/// Returns [`crate::ClientError`] if the body does not match the schema or
/// its boundary is not a usable polygon.
pub fn parse_territory_response(body: serde_json::Value) -> Result<Territory, crate::ClientError> {
    let api: ApiTerritory = serde_json::from_value(unwrap_data(body))?;
    Ok(Territory::try_from(api)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
        ]
    }

    #[test]
    fn overlap_request_closes_ring_and_swaps_axes() {
        let residents = vec![Resident::new("r1", "5 Oak Ave", Point::new(0.25, 0.75))];
        let request = OverlapCheckRequest::new(&square(), &residents, Some("zone-9"));
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "boundary": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                },
                "buildingData": {
                    "addresses": ["5 Oak Ave"],
                    "coordinates": [[0.75, 0.25]]
                },
                "excludeZoneId": "zone-9"
            })
        );
    }

    #[test]
    fn overlap_request_omits_exclude_id_in_create_mode() {
        let body = serde_json::to_value(OverlapCheckRequest::new(&square(), &[], None)).unwrap();
        assert!(body.get("excludeZoneId").is_none());
        assert_eq!(body["buildingData"], json!({"addresses": [], "coordinates": []}));
    }

    #[test]
    fn create_request_has_no_hint_and_no_empty_building_data() {
        let request = TerritoryRequest::builder("North", "Blocks 1-4", &square())
            .buildings(&[])
            .location(LocationSelection::new("a1", "m1", "c1"))
            .build();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["name"], "North");
        assert_eq!(body["areaId"], "a1");
        assert_eq!(body["municipalityId"], "m1");
        assert_eq!(body["communityId"], "c1");
        assert!(body.get("buildingData").is_none());
        assert!(body.get("isBoundaryUpdateOnly").is_none());
        assert!(body.get("isNameDescriptionUpdateOnly").is_none());
        assert_eq!(body["boundary"]["coordinates"][0].as_array().unwrap().len(), 5);
    }

    #[test]
    fn update_request_carries_exactly_one_hint() {
        let request = TerritoryRequest::builder("B", "", &square())
            .hint(UpdateHint::NameDescriptionOnly)
            .build();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["isNameDescriptionUpdateOnly"], true);
        assert!(body.get("isBoundaryUpdateOnly").is_none());
        assert!(body.get("areaId").is_none());
    }

    #[test]
    fn parses_overlap_response_with_optional_fields_missing() {
        let response = parse_overlap_response(json!({ "hasOverlap": false })).unwrap();
        assert!(!response.has_overlap);
        assert!(response.overlapping_names().is_empty());
        assert!(response.duplicates().is_empty());
    }

    #[test]
    fn parses_wrapped_overlap_response() {
        let response = parse_overlap_response(json!({
            "data": {
                "hasOverlap": true,
                "overlappingZones": [{ "name": "North Block" }],
                "duplicateBuildings": ["1 Main St"]
            }
        }))
        .unwrap();
        assert_eq!(response.overlapping_names(), vec!["North Block"]);
        assert_eq!(response.duplicates(), ["1 Main St".to_string()]);
    }

    #[test]
    fn parses_detection_response() {
        let detection = parse_detection_response(json!({
            "buildings": [{
                "id": "b-1",
                "location": { "latitude": 0.5, "longitude": 0.5 },
                "address": "7 Pine Rd",
                "source": "simulated"
            }],
            "warnings": ["Address provider degraded"]
        }))
        .unwrap();
        assert_eq!(detection.buildings.len(), 1);
        assert_eq!(detection.warnings, vec!["Address provider degraded"]);
    }

    #[test]
    fn parses_territory_response_into_lat_lng() {
        let territory = parse_territory_response(json!({
            "data": {
                "id": "zone-1",
                "name": "North",
                "boundary": {
                    "type": "Polygon",
                    "coordinates": [[[-87.0, 41.0], [-87.0, 41.5], [-87.5, 41.5], [-87.0, 41.0]]]
                },
                "status": "active",
                "assignedAgentId": "agent-7",
                "area": { "id": "a1", "name": "Cook County" },
                "residentIds": ["r1"],
                "createdAt": "2026-01-02T03:04:05Z",
                "updatedAt": "2026-01-02T03:04:05Z"
            }
        }))
        .unwrap();
        assert_eq!(territory.id, "zone-1");
        assert_eq!(territory.boundary.len(), 3);
        assert_eq!(territory.boundary[0], Point::new(41.0, -87.0));
        assert_eq!(territory.description, "");
        assert_eq!(territory.status, TerritoryStatus::Active);
        assert_eq!(territory.assignment.unwrap().agent_id, "agent-7");
        assert_eq!(
            territory.area.and_then(|a| a.name).as_deref(),
            Some("Cook County")
        );
    }

    #[test]
    fn rejects_territory_with_non_polygon_boundary() {
        let result = parse_territory_response(json!({
            "id": "zone-1",
            "name": "North",
            "boundary": { "type": "Point", "coordinates": [0.0, 0.0] },
            "createdAt": "2026-01-02T03:04:05Z",
            "updatedAt": "2026-01-02T03:04:05Z"
        }));
        assert!(matches!(result, Err(crate::ClientError::Geometry(_))));
    }
}
