//! reqwest implementation of the generation service contract.

use async_trait::async_trait;
use poster_types::{
    CityDetail, GalleryResponse, GenerateRequest, GenerationService, HealthResponse,
    PosterSizesResponse, PublishRequest, PublishResponse, ServiceError, TaskResponse,
    TaskStatusResponse, ThemesResponse, VerifyPasswordRequest, VerifyPasswordResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Client for the generation backend at a configurable API base.
pub struct HttpGenerationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerationService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Base URL from `POSTER_API_BASE`, defaulting to the local backend.
    pub fn from_env() -> Self {
        let base = std::env::var("POSTER_API_BASE")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        Self::new(base)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a service-relative path such as a returned
    /// `poster_url` or `thumbnail_url`.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        res: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        tracing::debug!(path, "GET");
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        self.read_json(res).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        tracing::debug!(path, "POST");
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        self.read_json(res).await
    }
}

/// The backend wraps errors as `{"detail": "..."}`; fall back to the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail")?.as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn submit(&self, req: &GenerateRequest) -> Result<TaskResponse, ServiceError> {
        self.post_json("/generate", req).await
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, ServiceError> {
        self.get_json(&format!("/task/{}", task_id)).await
    }

    async fn themes(&self) -> Result<ThemesResponse, ServiceError> {
        self.get_json("/themes").await
    }

    async fn poster_sizes(&self) -> Result<PosterSizesResponse, ServiceError> {
        self.get_json("/poster-sizes").await
    }

    async fn gallery(&self, page: u32, limit: u32) -> Result<GalleryResponse, ServiceError> {
        let res = self
            .client
            .get(format!("{}/gallery", self.base_url))
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        self.read_json(res).await
    }

    async fn city_detail(&self, slug: &str) -> Result<CityDetail, ServiceError> {
        self.get_json(&format!("/city/{}", slug)).await
    }

    async fn verify_password(
        &self,
        password: &str,
    ) -> Result<VerifyPasswordResponse, ServiceError> {
        let body = VerifyPasswordRequest {
            password: password.to_string(),
        };
        self.post_json("/verify-password", &body).await
    }

    async fn publish_to_gallery(
        &self,
        req: &PublishRequest,
    ) -> Result<PublishResponse, ServiceError> {
        self.post_json("/publish-to-gallery", req).await
    }

    async fn health(&self) -> Result<HealthResponse, ServiceError> {
        self.get_json("/health").await
    }
}
