//! Service trait for the generation backend and its error taxonomy.

use crate::{
    CityDetail, GalleryResponse, GenerateRequest, HealthResponse, PosterSizesResponse,
    PublishRequest, PublishResponse, TaskResponse, TaskStatusResponse, ThemesResponse,
    VerifyPasswordResponse,
};
use async_trait::async_trait;

/// Errors from talking to the generation backend.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service returned {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// The generation backend as the client sees it.
///
/// Submission returns a task id; status is polled until terminal. Themes,
/// poster sizes, gallery and city listings are plain reads; publish and
/// password verification are the admin side channel.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Submit a generation job (POST /generate).
    async fn submit(&self, req: &GenerateRequest) -> Result<TaskResponse, ServiceError>;

    /// Fetch one status snapshot (GET /task/{task_id}).
    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, ServiceError>;

    /// List available themes (GET /themes).
    async fn themes(&self) -> Result<ThemesResponse, ServiceError>;

    /// List poster size presets (GET /poster-sizes).
    async fn poster_sizes(&self) -> Result<PosterSizesResponse, ServiceError>;

    /// Page through the public gallery (GET /gallery).
    async fn gallery(&self, page: u32, limit: u32) -> Result<GalleryResponse, ServiceError>;

    /// All posters for one city (GET /city/{slug}).
    async fn city_detail(&self, slug: &str) -> Result<CityDetail, ServiceError>;

    /// Check the admin password (POST /verify-password).
    async fn verify_password(&self, password: &str)
        -> Result<VerifyPasswordResponse, ServiceError>;

    /// Move a temporary poster into the public gallery (POST /publish-to-gallery).
    async fn publish_to_gallery(&self, req: &PublishRequest)
        -> Result<PublishResponse, ServiceError>;

    /// Liveness probe (GET /health).
    async fn health(&self) -> Result<HealthResponse, ServiceError>;
}
