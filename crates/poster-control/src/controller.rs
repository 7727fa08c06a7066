//! The polling controller: one active job, fixed-cadence status fetches,
//! generation-checked response application.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use poster_types::{
    GenerateRequest, GenerationService, JobState, LocationInput, NetworkType, OutputFormat,
    RequestError, ServiceError,
};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const CONTRACT_ERROR_MESSAGE: &str = "generation service returned an inconsistent status";
const TIMEOUT_MESSAGE: &str = "timed out waiting for the generation service";
const UNREACHABLE_MESSAGE: &str = "generation service unreachable";

/// Timing knobs for the polling loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fixed period between status fetches.
    pub interval: Duration,
    /// Client-side cap on how long a job may stay non-terminal. `None` polls
    /// forever, matching the original frontend.
    pub max_wait: Option<Duration>,
    /// Fail the job after this many back-to-back fetch errors. `None` never
    /// gives up; single tick errors are always swallowed.
    pub max_consecutive_errors: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: Some(Duration::from_secs(600)),
            max_consecutive_errors: None,
        }
    }
}

/// Everything the form collects besides the location.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub theme: String,
    pub distance: u32,
    pub network_type: NetworkType,
    pub format: OutputFormat,
    pub thumbnail: bool,
    pub hide_attribution: bool,
    pub poster_size: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            theme: "noir".to_string(),
            distance: 12_000,
            network_type: NetworkType::Drive,
            format: OutputFormat::Png,
            thumbnail: false,
            hide_attribution: false,
            poster_size: "A3".to_string(),
        }
    }
}

/// Submission failed; no job was created and no polling started.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("submission failed: {0}")]
    Service(#[from] ServiceError),
}

/// The observable job slot: the active job plus its generation token.
#[derive(Debug, Clone)]
pub struct JobView {
    /// Identity of this job within the controller. A response is applied only
    /// while its generation is still the current one.
    pub generation: u64,
    pub job: JobState,
}

/// Owns the active-job slot and the polling loop for it.
///
/// The presentation layer observes through [`subscribe`]; all mutation goes
/// through submitted responses or [`shutdown`]. Dropping the controller
/// cancels the loop.
///
/// [`subscribe`]: JobController::subscribe
/// [`shutdown`]: JobController::shutdown
pub struct JobController {
    service: Arc<dyn GenerationService>,
    config: PollConfig,
    tx: Arc<watch::Sender<Option<JobView>>>,
    /// Generation of the active job; bumped on supersession and teardown so
    /// stale responses fail the identity check even mid-application.
    current: Arc<AtomicU64>,
    active: Mutex<Option<CancellationToken>>,
}

impl JobController {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self::with_config(service, PollConfig::default())
    }

    pub fn with_config(service: Arc<dyn GenerationService>, config: PollConfig) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            service,
            config,
            tx: Arc::new(tx),
            current: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    /// Watch the active-job slot. Receivers see every applied change.
    pub fn subscribe(&self) -> watch::Receiver<Option<JobView>> {
        self.tx.subscribe()
    }

    /// Current contents of the slot.
    pub fn snapshot(&self) -> Option<JobView> {
        self.tx.borrow().clone()
    }

    /// Build, validate and submit a generation request.
    ///
    /// On acceptance the previous job (if any) is superseded: its loop is
    /// cancelled and its in-flight responses are discarded. The new job
    /// starts `pending` and its first status fetch happens one poll interval
    /// later. On failure nothing changes; a previously active job keeps
    /// polling, as in the original frontend.
    pub async fn submit(
        &self,
        location: LocationInput,
        options: GenerateOptions,
    ) -> Result<String, SubmitError> {
        let request = build_request(&location, &options)?;
        let accepted = self.service.submit(&request).await?;
        let task_id = accepted.task_id;
        tracing::info!(task_id = %task_id, city = %request.city, "generation job accepted");

        let cancel = CancellationToken::new();
        let generation = {
            let mut active = lock(&self.active);
            let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(old) = active.replace(cancel.clone()) {
                old.cancel();
            }
            self.tx.send_replace(Some(JobView {
                generation,
                job: JobState::pending(&task_id, request),
            }));
            generation
        };

        tokio::spawn(poll_loop(
            Arc::clone(&self.service),
            self.config.clone(),
            Arc::clone(&self.tx),
            Arc::clone(&self.current),
            generation,
            task_id.clone(),
            cancel,
        ));
        Ok(task_id)
    }

    /// Stop polling and clear the job slot. No further ticks fire and any
    /// in-flight response is discarded. The service keeps processing on its
    /// side; there is no server-side cancellation.
    pub fn shutdown(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = lock(&self.active).take() {
            token.cancel();
        }
        self.tx.send_replace(None);
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.active).take() {
            token.cancel();
        }
    }
}

fn lock(active: &Mutex<Option<CancellationToken>>) -> MutexGuard<'_, Option<CancellationToken>> {
    match active.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn build_request(
    location: &LocationInput,
    options: &GenerateOptions,
) -> Result<GenerateRequest, RequestError> {
    let resolved = location.resolve()?;
    let request = GenerateRequest {
        city: resolved.city,
        country: resolved.country,
        latitude: resolved.latitude,
        longitude: resolved.longitude,
        theme: options.theme.clone(),
        distance: options.distance,
        network_type: options.network_type,
        format: options.format,
        thumbnail: options.thumbnail,
        hide_attribution: options.hide_attribution,
        poster_size: options.poster_size.clone(),
    };
    request.validate()?;
    Ok(request)
}

enum Applied {
    /// Superseded or torn down; the response was discarded.
    Stale,
    Live,
    Terminal,
}

async fn poll_loop(
    service: Arc<dyn GenerationService>,
    config: PollConfig,
    tx: Arc<watch::Sender<Option<JobView>>>,
    current: Arc<AtomicU64>,
    generation: u64,
    task_id: String,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let mut ticks = interval_at(started + config.interval, config.interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_errors = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticks.tick() => {}
        }

        if let Some(max_wait) = config.max_wait {
            if started.elapsed() >= max_wait {
                tracing::warn!(task_id = %task_id, "job exceeded the client-side wait limit");
                force_failure(&tx, &current, generation, TIMEOUT_MESSAGE);
                return;
            }
        }

        // The timer keeps its fixed cadence regardless of fetch latency, so a
        // cancelled token must also abort the fetch itself.
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            res = service.task_status(&task_id) => res,
        };

        let snap = match fetched {
            Ok(snap) => {
                consecutive_errors = 0;
                snap
            }
            Err(err) => {
                consecutive_errors += 1;
                tracing::warn!(
                    task_id = %task_id,
                    error = %err,
                    "status fetch failed; keeping last known state"
                );
                if let Some(cap) = config.max_consecutive_errors {
                    if consecutive_errors >= cap {
                        force_failure(&tx, &current, generation, UNREACHABLE_MESSAGE);
                        return;
                    }
                }
                continue;
            }
        };

        let mut outcome = Applied::Stale;
        tx.send_if_modified(|slot| {
            if current.load(Ordering::SeqCst) != generation {
                return false;
            }
            let Some(view) = slot.as_mut() else {
                return false;
            };
            if view.generation != generation {
                return false;
            }
            match view.job.apply(&snap) {
                Ok(changed) => {
                    outcome = if view.job.status.is_terminal() {
                        Applied::Terminal
                    } else {
                        Applied::Live
                    };
                    changed
                }
                Err(violation) => {
                    tracing::error!(task_id = %task_id, %violation, "status contract violated");
                    view.job.fail(CONTRACT_ERROR_MESSAGE);
                    outcome = Applied::Terminal;
                    true
                }
            }
        });

        match outcome {
            Applied::Stale => return,
            Applied::Terminal => {
                tracing::info!(task_id = %task_id, "job reached a terminal status");
                return;
            }
            Applied::Live => {
                tracing::debug!(task_id = %task_id, status = ?snap.status, progress = snap.progress, "applied status snapshot");
            }
        }
    }
}

fn force_failure(
    tx: &watch::Sender<Option<JobView>>,
    current: &AtomicU64,
    generation: u64,
    message: &str,
) {
    tx.send_if_modified(|slot| {
        if current.load(Ordering::SeqCst) != generation {
            return false;
        }
        match slot.as_mut() {
            Some(view) if view.generation == generation => view.job.fail(message),
            _ => false,
        }
    });
}
