//! Shared in-memory resident and territory collections.
//!
//! Both stores are append/replace only: there is no delete. Reads hand out
//! cloned snapshots so no lock is ever held by a caller.

use std::collections::BTreeMap;
use std::sync::RwLock;

use canvass_geometry::points_equal;
use canvass_territory_models::{Point, Resident, Territory};

use crate::membership::filter_in_polygon;

/// Every known resident, keyed by id.
#[derive(Debug, Default)]
pub struct ResidentStore {
    residents: RwLock<BTreeMap<String, Resident>>,
}

impl ResidentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `residents`.
    #[must_use]
    pub fn with_residents(residents: impl IntoIterator<Item = Resident>) -> Self {
        let store = Self::new();
        store.upsert_many(residents);
        store
    }

    /// Looks up a resident by id.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Resident> {
        self.residents
            .read()
            .expect("resident store lock poisoned")
            .get(id)
            .cloned()
    }

    /// Looks up several residents, skipping ids that are not known.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn get_many<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<Resident> {
        let residents = self.residents.read().expect("resident store lock poisoned");
        ids.into_iter()
            .filter_map(|id| residents.get(id).cloned())
            .collect()
    }

    /// Returns every resident, ordered by id.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Resident> {
        self.residents
            .read()
            .expect("resident store lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Finds a resident on record within `tolerance` degrees of `location`
    /// on both axes.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn find_at(&self, location: Point, tolerance: f64) -> Option<Resident> {
        self.residents
            .read()
            .expect("resident store lock poisoned")
            .values()
            .find(|r| points_equal(r.location, location, tolerance))
            .cloned()
    }

    /// Residents currently known to lie strictly inside `polygon`.
    #[must_use]
    pub fn residents_in_polygon(&self, polygon: &[Point]) -> Vec<Resident> {
        filter_in_polygon(polygon, &self.snapshot())
    }

    /// Inserts or replaces a resident.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn upsert(&self, resident: Resident) {
        self.residents
            .write()
            .expect("resident store lock poisoned")
            .insert(resident.id.clone(), resident);
    }

    /// Inserts or replaces many residents under one lock.
    ///
    /// Returns how many ids were not previously known.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn upsert_many(&self, residents: impl IntoIterator<Item = Resident>) -> usize {
        let mut map = self.residents.write().expect("resident store lock poisoned");
        let mut added = 0;
        for resident in residents {
            if map.insert(resident.id.clone(), resident).is_none() {
                added += 1;
            }
        }
        added
    }

    /// Inserts residents whose ids are not yet known, leaving existing
    /// records untouched. Returns how many were inserted.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn insert_missing(&self, residents: impl IntoIterator<Item = Resident>) -> usize {
        let mut map = self.residents.write().expect("resident store lock poisoned");
        let mut added = 0;
        for resident in residents {
            if !map.contains_key(&resident.id) {
                map.insert(resident.id.clone(), resident);
                added += 1;
            }
        }
        added
    }

    /// Number of known residents.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.residents.read().expect("resident store lock poisoned").len()
    }

    /// Whether no residents are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every known territory, keyed by id.
#[derive(Debug, Default)]
pub struct TerritoryStore {
    territories: RwLock<BTreeMap<String, Territory>>,
}

impl TerritoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a territory by id.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Territory> {
        self.territories
            .read()
            .expect("territory store lock poisoned")
            .get(id)
            .cloned()
    }

    /// Inserts or replaces a territory. Returns the previous version.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn upsert(&self, territory: Territory) -> Option<Territory> {
        self.territories
            .write()
            .expect("territory store lock poisoned")
            .insert(territory.id.clone(), territory)
    }

    /// Number of known territories.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.territories
            .read()
            .expect("territory store lock poisoned")
            .len()
    }

    /// Whether no territories are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvass_territory_models::ResidentStatus;

    #[test]
    fn upsert_many_counts_new_ids() {
        let store = ResidentStore::new();
        let a = Resident::new("a", "1 A St", Point::new(0.5, 0.5));
        let b = Resident::new("b", "2 B St", Point::new(0.6, 0.6));
        assert_eq!(store.upsert_many([a.clone(), b]), 2);

        let visited = Resident {
            status: ResidentStatus::Visited,
            ..a
        };
        assert_eq!(store.upsert_many([visited]), 0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").unwrap().status, ResidentStatus::Visited);
    }

    #[test]
    fn insert_missing_keeps_existing_records() {
        let store = ResidentStore::with_residents([Resident {
            status: ResidentStatus::Appointment,
            ..Resident::new("a", "1 A St", Point::new(0.5, 0.5))
        }]);
        let added = store.insert_missing([
            Resident::new("a", "1 A St", Point::new(0.5, 0.5)),
            Resident::new("b", "2 B St", Point::new(0.6, 0.6)),
        ]);
        assert_eq!(added, 1);
        assert_eq!(store.get("a").unwrap().status, ResidentStatus::Appointment);
        assert!(store.get("b").is_some());
    }

    #[test]
    fn get_many_skips_unknown_ids() {
        let store = ResidentStore::with_residents([
            Resident::new("a", "1 A St", Point::new(0.5, 0.5)),
            Resident::new("b", "2 B St", Point::new(0.6, 0.6)),
        ]);
        let found = store.get_many(["b", "missing", "a"]);
        let ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn find_at_matches_within_tolerance() {
        let store = ResidentStore::with_residents([
            Resident::new("a", "1 A St", Point::new(0.0, 0.5)),
            Resident::new("b", "2 B St", Point::new(0.6, 0.6)),
        ]);
        assert_eq!(
            store.find_at(Point::new(0.000_000_5, 0.5), 1e-6).map(|r| r.id),
            Some("a".to_string())
        );
        assert!(store.find_at(Point::new(0.0, 0.51), 1e-6).is_none());
    }

    #[test]
    fn residents_in_polygon_uses_current_snapshot() {
        let store = ResidentStore::new();
        let square = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
        ];
        assert!(store.residents_in_polygon(&square).is_empty());

        store.upsert(Resident::new("a", "1 A St", Point::new(0.5, 0.5)));
        assert_eq!(store.residents_in_polygon(&square).len(), 1);
    }
}
