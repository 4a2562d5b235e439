//! In-memory collaborators for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use canvass_client::api::{OverlapCheckRequest, OverlapCheckResponse, TerritoryRequest};
use canvass_client::{BuildingDetector, ClientError, OverlapValidator, TerritoryRepository};
use canvass_territory_models::{
    BuildingDetection, LocationRef, LocationSelection, Point, Territory, TerritoryStatus,
};
use chrono::Utc;
use tokio::sync::Notify;

/// Scriptable stand-in for the territory API.
#[derive(Default)]
pub struct FakeApi {
    pub overlap: Mutex<OverlapCheckResponse>,
    pub detection: Mutex<BuildingDetection>,
    /// Boundary the repository answers with instead of the requested one.
    pub canonical_boundary: Mutex<Option<Vec<Point>>>,
    /// When set, the overlap check waits for a notification first.
    pub overlap_gate: Mutex<Option<Arc<Notify>>>,
    /// When set, every repository call sleeps this long first.
    pub save_delay: Mutex<Option<Duration>>,
    pub fail_overlap: AtomicBool,
    pub fail_detection: AtomicBool,
    pub fail_save: AtomicBool,
    pub overlap_calls: AtomicUsize,
    pub detect_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub overlap_requests: Mutex<Vec<OverlapCheckRequest>>,
    pub saved_requests: Mutex<Vec<TerritoryRequest>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn total_calls(&self) -> usize {
        self.overlap_calls.load(Ordering::SeqCst)
            + self.detect_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.update_calls.load(Ordering::SeqCst)
    }

    pub fn gate_overlap(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.overlap_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn last_saved(&self) -> TerritoryRequest {
        self.saved_requests.lock().unwrap().last().cloned().unwrap()
    }

    fn unavailable() -> ClientError {
        ClientError::Status {
            status: 503,
            message: "service unavailable".to_string(),
        }
    }

    async fn respond(&self, id: String, request: &TerritoryRequest) -> Result<Territory, ClientError> {
        let delay = *self.save_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.saved_requests.lock().unwrap().push(request.clone());
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let boundary = self
            .canonical_boundary
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| request.boundary().to_vec());
        Ok(territory(&id, request.name(), request.description(), boundary, request.location()))
    }
}

#[async_trait]
impl OverlapValidator for FakeApi {
    async fn check_overlap(
        &self,
        request: &OverlapCheckRequest,
    ) -> Result<OverlapCheckResponse, ClientError> {
        self.overlap_calls.fetch_add(1, Ordering::SeqCst);
        self.overlap_requests.lock().unwrap().push(request.clone());

        let gate = self.overlap_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_overlap.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.overlap.lock().unwrap().clone())
    }
}

#[async_trait]
impl BuildingDetector for FakeApi {
    async fn detect_buildings(&self, _polygon: &[Point]) -> Result<BuildingDetection, ClientError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_detection.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.detection.lock().unwrap().clone())
    }
}

#[async_trait]
impl TerritoryRepository for FakeApi {
    async fn create_territory(&self, request: &TerritoryRequest) -> Result<Territory, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.respond("zone-new".to_string(), request).await
    }

    async fn update_territory(
        &self,
        id: &str,
        request: &TerritoryRequest,
    ) -> Result<Territory, ClientError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(id.to_string(), request).await
    }
}

pub fn square() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, 1.0),
        Point::new(1.0, 1.0),
        Point::new(1.0, 0.0),
    ]
}

pub fn territory(
    id: &str,
    name: &str,
    description: &str,
    boundary: Vec<Point>,
    location: &LocationSelection,
) -> Territory {
    let level = |id: &Option<String>| {
        id.as_ref().map(|id| LocationRef {
            id: id.clone(),
            name: None,
        })
    };
    Territory {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        boundary,
        status: TerritoryStatus::Draft,
        assignment: None,
        area: level(&location.area_id),
        municipality: level(&location.municipality_id),
        community: level(&location.community_id),
        resident_ids: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
