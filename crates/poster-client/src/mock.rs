//! Scriptable in-process generation service for tests: no network.

use async_trait::async_trait;
use poster_types::{
    CityDetail, GalleryResponse, GenerateRequest, GenerationService, HealthResponse,
    PosterSize, PosterSizesResponse, PublishRequest, PublishResponse, ServiceError, TaskResponse,
    TaskStatus, TaskStatusResponse, ThemesResponse, VerifyPasswordResponse,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
enum Scripted {
    Status(TaskStatusResponse),
    TransportError(String),
}

#[derive(Default)]
struct Inner {
    task_ids: VecDeque<String>,
    submitted: Vec<GenerateRequest>,
    submit_error: Option<String>,
    responses: HashMap<String, VecDeque<Scripted>>,
    last_status: HashMap<String, TaskStatusResponse>,
    status_calls: HashMap<String, u32>,
    status_delays: HashMap<String, Duration>,
    published: Vec<PublishRequest>,
}

/// Generation service with scripted responses, call counters, and optional
/// per-task fetch delays for timing-sensitive tests.
///
/// Status responses queue per task id and are consumed in order; once a queue
/// runs dry the last returned snapshot repeats, which mirrors a backend that
/// keeps answering with the terminal state.
pub struct MockGenerationService {
    inner: Mutex<Inner>,
    admin_password: String,
}

impl Default for MockGenerationService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerationService {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            admin_password: "admin123".to_string(),
        }
    }

    /// Next submissions return these ids in order; falls back to fresh UUIDs.
    pub fn queue_task_id(&self, task_id: impl Into<String>) {
        self.lock().task_ids.push_back(task_id.into());
    }

    /// The next submit call fails with a transport error.
    pub fn fail_next_submit(&self, message: impl Into<String>) {
        self.lock().submit_error = Some(message.into());
    }

    pub fn push_status(&self, task_id: impl Into<String>, snap: TaskStatusResponse) {
        self.lock()
            .responses
            .entry(task_id.into())
            .or_default()
            .push_back(Scripted::Status(snap));
    }

    pub fn push_status_error(&self, task_id: impl Into<String>, message: impl Into<String>) {
        self.lock()
            .responses
            .entry(task_id.into())
            .or_default()
            .push_back(Scripted::TransportError(message.into()));
    }

    /// Every status fetch for this task sleeps first, simulating a slow
    /// backend while the poll timer keeps its fixed cadence.
    pub fn set_status_delay(&self, task_id: impl Into<String>, delay: Duration) {
        self.lock().status_delays.insert(task_id.into(), delay);
    }

    pub fn status_calls(&self, task_id: &str) -> u32 {
        self.lock().status_calls.get(task_id).copied().unwrap_or(0)
    }

    pub fn submitted(&self) -> Vec<GenerateRequest> {
        self.lock().submitted.clone()
    }

    pub fn published(&self) -> Vec<PublishRequest> {
        self.lock().published.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl GenerationService for MockGenerationService {
    async fn submit(&self, req: &GenerateRequest) -> Result<TaskResponse, ServiceError> {
        let task_id = {
            let mut inner = self.lock();
            if let Some(message) = inner.submit_error.take() {
                return Err(ServiceError::Transport(message));
            }
            inner.submitted.push(req.clone());
            inner
                .task_ids
                .pop_front()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
        };
        Ok(TaskResponse {
            task_id,
            status: TaskStatus::Pending,
            message: Some("Task created successfully".to_string()),
        })
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, ServiceError> {
        let delay = {
            let mut inner = self.lock();
            *inner.status_calls.entry(task_id.to_string()).or_insert(0) += 1;
            inner.status_delays.get(task_id).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.lock();
        match inner
            .responses
            .get_mut(task_id)
            .and_then(|queue| queue.pop_front())
        {
            Some(Scripted::Status(snap)) => {
                inner.last_status.insert(task_id.to_string(), snap.clone());
                Ok(snap)
            }
            Some(Scripted::TransportError(message)) => Err(ServiceError::Transport(message)),
            None => inner
                .last_status
                .get(task_id)
                .cloned()
                .ok_or_else(|| ServiceError::Transport(format!("no scripted status for {task_id}"))),
        }
    }

    async fn themes(&self) -> Result<ThemesResponse, ServiceError> {
        Ok(ThemesResponse { themes: Vec::new() })
    }

    async fn poster_sizes(&self) -> Result<PosterSizesResponse, ServiceError> {
        Ok(PosterSizesResponse {
            sizes: vec![PosterSize {
                value: "A3".to_string(),
                label: "A3 - 30×42 cm".to_string(),
                width: 11.7,
                height: 16.5,
            }],
            default_size: "A3".to_string(),
        })
    }

    async fn gallery(&self, page: u32, limit: u32) -> Result<GalleryResponse, ServiceError> {
        Ok(GalleryResponse {
            cities: Vec::new(),
            total: 0,
            page,
            limit,
        })
    }

    async fn city_detail(&self, slug: &str) -> Result<CityDetail, ServiceError> {
        Err(ServiceError::Api {
            status: 404,
            detail: format!("City not found: {slug}"),
        })
    }

    async fn verify_password(
        &self,
        password: &str,
    ) -> Result<VerifyPasswordResponse, ServiceError> {
        let valid = password == self.admin_password;
        Ok(VerifyPasswordResponse {
            valid,
            message: Some(if valid { "Password verified" } else { "Invalid password" }.to_string()),
        })
    }

    async fn publish_to_gallery(
        &self,
        req: &PublishRequest,
    ) -> Result<PublishResponse, ServiceError> {
        if req.password != self.admin_password {
            return Err(ServiceError::Api {
                status: 401,
                detail: "Invalid password. Please check your password.".to_string(),
            });
        }
        self.lock().published.push(req.clone());
        Ok(PublishResponse {
            success: true,
            message: "Poster published to gallery successfully".to_string(),
            gallery_path: Some(format!("/posters/{}", req.poster_path)),
        })
    }

    async fn health(&self) -> Result<HealthResponse, ServiceError> {
        Ok(HealthResponse {
            status: "healthy".to_string(),
        })
    }
}
