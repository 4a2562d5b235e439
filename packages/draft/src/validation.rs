//! Pure pieces of the validation protocol: turning an overlap response
//! into user-facing errors and warnings, and merging detected buildings
//! with residents already on record.
//!
//! De-duplication: a detected building is dropped when its id is already
//! present, or when any resident on record sits at the same coordinates
//! (within [`COORDINATE_TOLERANCE`]). A building whose id is on record
//! elsewhere in the store contributes the stored resident rather than a
//! fresh one.

use std::collections::BTreeSet;

use canvass_client::api::OverlapCheckResponse;
use canvass_geometry::{COORDINATE_TOLERANCE, points_equal};
use canvass_residents::ResidentStore;
use canvass_territory_models::{DetectedBuilding, Resident};

/// Shown when a collaborator fails or times out during validation.
pub const VALIDATION_FAILED_MESSAGE: &str =
    "Unable to validate this territory right now. Please try again.";

/// Errors and warnings derived from an overlap check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapFindings {
    /// Blocking errors (geometric overlap).
    pub errors: Vec<String>,
    /// Non-blocking warnings (duplicate buildings).
    pub warnings: Vec<String>,
    /// Addresses claimed by another territory.
    pub duplicate_addresses: Vec<String>,
}

impl OverlapFindings {
    /// Interprets an overlap response.
    #[must_use]
    pub fn from_response(response: &OverlapCheckResponse) -> Self {
        let mut findings = Self::default();

        if response.has_overlap {
            findings
                .errors
                .push(overlap_message(&response.overlapping_names()));
        }

        let duplicates = response.duplicates();
        if !duplicates.is_empty() {
            findings.warnings.push(duplicate_message(duplicates));
            findings.duplicate_addresses = duplicates.to_vec();
        }

        findings
    }

    /// Whether saving is blocked.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Error text for an overlap with the named territories.
#[must_use]
pub fn overlap_message(zone_names: &[&str]) -> String {
    if zone_names.is_empty() {
        "This territory overlaps with an existing zone. Adjust the drawing to continue."
            .to_string()
    } else {
        format!(
            "This territory overlaps with existing zone(s): {}. Adjust the drawing to continue.",
            zone_names.join(", ")
        )
    }
}

/// Warning text for buildings already claimed elsewhere.
#[must_use]
pub fn duplicate_message(addresses: &[String]) -> String {
    format!(
        "{} building(s) already belong to another zone: {}",
        addresses.len(),
        addresses.join(", ")
    )
}

/// Merges detected buildings into the residents known inside a polygon.
///
/// `store` is the full resident store. It is consulted by id and by
/// location, so a resident on record just outside `known` (on the
/// boundary, say) is never re-created from a detection. Known residents
/// keep their position at the front of the result; new residents follow in
/// detection order.
#[must_use]
pub fn merge_residents(
    known: Vec<Resident>,
    buildings: &[DetectedBuilding],
    store: &ResidentStore,
) -> Vec<Resident> {
    let mut ids: BTreeSet<String> = known.iter().map(|r| r.id.clone()).collect();
    let mut merged = known;

    for building in buildings {
        if ids.contains(&building.id) {
            continue;
        }

        if let Some(existing) = store.get(&building.id) {
            ids.insert(existing.id.clone());
            merged.push(existing);
            continue;
        }

        let on_record = merged
            .iter()
            .find(|r| points_equal(r.location, building.location, COORDINATE_TOLERANCE))
            .map(|r| r.id.clone())
            .or_else(|| {
                store
                    .find_at(building.location, COORDINATE_TOLERANCE)
                    .map(|r| r.id)
            });
        if let Some(resident_id) = on_record {
            log::debug!(
                "Skipping detected building {} at {:?}: resident {resident_id} is already on record there",
                building.id,
                building.location
            );
            continue;
        }

        ids.insert(building.id.clone());
        merged.push(Resident::from(building));
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvass_client::api::ZoneRef;
    use canvass_territory_models::{BuildingSource, Point, ResidentStatus};

    fn building(id: &str, lat: f64, lng: f64) -> DetectedBuilding {
        DetectedBuilding {
            id: id.to_string(),
            location: Point::new(lat, lng),
            address: format!("{id} Detected Rd"),
            house_number: None,
            source: BuildingSource::Authoritative,
        }
    }

    #[test]
    fn overlap_message_lists_zone_names() {
        let response = OverlapCheckResponse {
            has_overlap: true,
            overlapping_zones: Some(vec![
                ZoneRef {
                    name: "North Block".to_string(),
                    id: None,
                },
                ZoneRef {
                    name: "East End".to_string(),
                    id: Some("z2".to_string()),
                },
            ]),
            duplicate_buildings: None,
        };
        let findings = OverlapFindings::from_response(&response);
        assert!(findings.is_blocking());
        assert_eq!(
            findings.errors,
            vec![
                "This territory overlaps with existing zone(s): North Block, East End. \
                 Adjust the drawing to continue."
                    .to_string()
            ]
        );
    }

    #[test]
    fn duplicates_are_warnings_not_errors() {
        let response = OverlapCheckResponse {
            has_overlap: false,
            overlapping_zones: None,
            duplicate_buildings: Some(vec!["1 Main St".to_string(), "3 Main St".to_string()]),
        };
        let findings = OverlapFindings::from_response(&response);
        assert!(!findings.is_blocking());
        assert_eq!(
            findings.warnings,
            vec!["2 building(s) already belong to another zone: 1 Main St, 3 Main St".to_string()]
        );
        assert_eq!(findings.duplicate_addresses.len(), 2);
    }

    #[test]
    fn merge_adds_new_buildings_as_not_visited() {
        let merged = merge_residents(Vec::new(), &[building("b1", 0.5, 0.5)], &ResidentStore::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "b1");
        assert_eq!(merged[0].status, ResidentStatus::NotVisited);
    }

    #[test]
    fn merge_never_recreates_known_ids() {
        let known = Resident {
            status: ResidentStatus::Interested,
            ..Resident::new("b1", "1 Known St", Point::new(0.2, 0.2))
        };
        let merged = merge_residents(vec![known], &[building("b1", 0.5, 0.5)], &ResidentStore::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, ResidentStatus::Interested);
    }

    #[test]
    fn merge_skips_buildings_at_known_coordinates() {
        let known = Resident::new("r1", "1 Known St", Point::new(0.5, 0.5));
        let merged = merge_residents(
            vec![known],
            &[building("b9", 0.500_000_1, 0.5), building("b10", 0.7, 0.7)],
            &ResidentStore::new(),
        );
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "b10"]);
    }

    #[test]
    fn merge_prefers_stored_record_for_known_id() {
        let stored = Resident {
            status: ResidentStatus::Callback,
            ..Resident::new("b1", "1 Stored St", Point::new(0.0, 0.5))
        };
        let store = ResidentStore::with_residents([stored.clone()]);
        let merged = merge_residents(Vec::new(), &[building("b1", 0.0, 0.5)], &store);
        assert_eq!(merged, vec![stored]);
    }

    #[test]
    fn merge_drops_duplicate_detections() {
        let merged = merge_residents(
            Vec::new(),
            &[building("b1", 0.5, 0.5), building("b1", 0.6, 0.6)],
            &ResidentStore::new(),
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn merge_skips_buildings_at_coordinates_on_record_outside_known() {
        let on_edge = Resident::new("r-edge", "1 Edge St", Point::new(0.0, 0.5));
        let store = ResidentStore::with_residents([on_edge]);
        let merged = merge_residents(
            Vec::new(),
            &[building("b-new", 0.0, 0.5), building("b2", 0.5, 0.5)],
            &store,
        );
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b2"]);
    }
}
