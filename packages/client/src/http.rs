//! REST implementation of the collaborator traits.

use std::time::Duration;

use async_trait::async_trait;
use canvass_territory_models::{BuildingDetection, Point, Territory};

use crate::api::{
    DetectBuildingsRequest, OverlapCheckRequest, OverlapCheckResponse, TerritoryRequest,
    parse_detection_response, parse_overlap_response, parse_territory_response,
};
use crate::config::ApiConfig;
use crate::retry::send_json;
use crate::{BuildingDetector, ClientError, OverlapValidator, TerritoryRepository};

/// Territory API client implementing all three collaborator traits.
#[derive(Debug, Clone)]
pub struct HttpTerritoryApi {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpTerritoryApi {
    /// Builds a client with the configured per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl OverlapValidator for HttpTerritoryApi {
    async fn check_overlap(
        &self,
        request: &OverlapCheckRequest,
    ) -> Result<OverlapCheckResponse, ClientError> {
        let url = self.url("zones/check-overlap");
        log::debug!("POST {url} (exclude={:?})", request.exclude_zone_id);

        let body = send_json(
            || self.authorize(self.client.post(&url).json(request)),
            self.config.max_retries,
        )
        .await?;

        Ok(parse_overlap_response(body)?)
    }
}

#[async_trait]
impl BuildingDetector for HttpTerritoryApi {
    async fn detect_buildings(&self, polygon: &[Point]) -> Result<BuildingDetection, ClientError> {
        let url = self.url("buildings/detect");
        let payload = DetectBuildingsRequest { polygon };
        log::debug!("POST {url} ({} vertices)", polygon.len());

        let body = send_json(|| self.authorize(self.client.post(&url).json(&payload)), 0).await?;

        Ok(parse_detection_response(body)?)
    }
}

#[async_trait]
impl TerritoryRepository for HttpTerritoryApi {
    async fn create_territory(&self, request: &TerritoryRequest) -> Result<Territory, ClientError> {
        let url = self.url("zones");
        log::debug!("POST {url} name={:?}", request.name());

        let body = send_json(|| self.authorize(self.client.post(&url).json(request)), 0).await?;

        parse_territory_response(body)
    }

    async fn update_territory(
        &self,
        id: &str,
        request: &TerritoryRequest,
    ) -> Result<Territory, ClientError> {
        let url = self.url(&format!("zones/{id}"));
        log::debug!("PUT {url} hint={:?}", request.hint());

        let body = send_json(|| self.authorize(self.client.put(&url).json(request)), 0).await?;

        parse_territory_response(body)
    }
}
