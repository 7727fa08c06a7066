//! Controller behavior: polling lifecycle, supersession, teardown, timeout.

use std::sync::Arc;
use std::time::Duration;

use poster_client::MockGenerationService;
use poster_control::{GenerateOptions, JobController, PollConfig, SubmitError};
use poster_types::{
    CityRecord, GenerationService, LocationInput, NetworkType, OutputFormat, PosterResult,
    TaskStatus, TaskStatusResponse,
};

fn paris() -> LocationInput {
    LocationInput::City(CityRecord {
        city: "Paris".to_string(),
        country: "France".to_string(),
        latitude: 48.8566,
        longitude: 2.3522,
    })
}

fn options() -> GenerateOptions {
    GenerateOptions {
        theme: "autumn".to_string(),
        distance: 12_000,
        network_type: NetworkType::Drive,
        format: OutputFormat::Png,
        thumbnail: true,
        hide_attribution: true,
        poster_size: "A3".to_string(),
    }
}

fn processing(task_id: &str, progress: u8) -> TaskStatusResponse {
    TaskStatusResponse {
        task_id: task_id.to_string(),
        status: TaskStatus::Processing,
        progress,
        result: None,
        error: None,
    }
}

fn completed(task_id: &str) -> TaskStatusResponse {
    TaskStatusResponse {
        task_id: task_id.to_string(),
        status: TaskStatus::Completed,
        progress: 100,
        result: Some(PosterResult {
            poster_url: format!("/temp_posters/paris/autumn_{task_id}.png"),
            thumbnail_url: None,
            city: "Paris".to_string(),
            country: "France".to_string(),
            theme: "autumn".to_string(),
            coords: [48.8566, 2.3522],
            created_at: "20260806_120000".to_string(),
            poster_size: Some("A3".to_string()),
            size_label: None,
        }),
        error: None,
    }
}

fn failed(task_id: &str, error: &str) -> TaskStatusResponse {
    TaskStatusResponse {
        task_id: task_id.to_string(),
        status: TaskStatus::Failed,
        progress: 0,
        result: None,
        error: Some(error.to_string()),
    }
}

fn controller(mock: &Arc<MockGenerationService>) -> JobController {
    let service: Arc<dyn GenerationService> = mock.clone();
    JobController::new(service)
}

#[tokio::test(start_paused = true)]
async fn submit_installs_a_pending_job_before_any_tick() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("t1");
    let ctl = controller(&mock);

    let task_id = ctl.submit(paris(), options()).await.unwrap();
    assert_eq!(task_id, "t1");

    let view = ctl.snapshot().unwrap();
    assert_eq!(view.job.task_id, "t1");
    assert_eq!(view.job.status, TaskStatus::Pending);
    assert_eq!(view.job.progress, 0);
    assert_eq!(mock.status_calls("t1"), 0);

    let sent = mock.submitted();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].city, "Paris");
    assert_eq!(sent[0].country, "France");
    assert_eq!(sent[0].latitude, Some(48.8566));
    assert_eq!(sent[0].longitude, Some(2.3522));
    assert_eq!(sent[0].theme, "autumn");
    assert_eq!(sent[0].distance, 12_000);
    assert_eq!(sent[0].network_type, NetworkType::Drive);
    assert_eq!(sent[0].format, OutputFormat::Png);
    assert!(sent[0].thumbnail);
    assert!(sent[0].hide_attribution);
    assert_eq!(sent[0].poster_size, "A3");
}

#[tokio::test(start_paused = true)]
async fn status_sequence_runs_to_completion_and_polling_stops() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("t1");
    mock.push_status("t1", processing("t1", 30));
    mock.push_status("t1", processing("t1", 70));
    mock.push_status("t1", completed("t1"));
    let ctl = controller(&mock);

    ctl.submit(paris(), options()).await.unwrap();
    let mut rx = ctl.subscribe();
    let mut seen = vec![rx.borrow_and_update().clone().unwrap().job.status];
    while seen.last() != Some(&TaskStatus::Completed) {
        rx.changed().await.unwrap();
        seen.push(rx.borrow_and_update().clone().unwrap().job.status);
    }
    assert_eq!(
        seen,
        vec![
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Processing,
            TaskStatus::Completed,
        ]
    );

    let view = ctl.snapshot().unwrap();
    assert_eq!(view.job.progress, 100);
    assert!(view.job.result.is_some());
    assert!(view.job.error.is_none());

    // a would-be fourth tick must never happen
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(mock.status_calls("t1"), 3);
}

#[tokio::test(start_paused = true)]
async fn failure_exposes_the_exact_error_string() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("t1");
    mock.push_status("t1", failed("t1", "out of quota"));
    let ctl = controller(&mock);

    ctl.submit(paris(), options()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let view = ctl.snapshot().unwrap();
    assert_eq!(view.job.status, TaskStatus::Failed);
    assert_eq!(view.job.error.as_deref(), Some("out of quota"));
    assert!(view.job.result.is_none());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(mock.status_calls("t1"), 1);
}

#[tokio::test(start_paused = true)]
async fn a_new_submission_supersedes_the_active_job() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("a");
    mock.queue_task_id("b");
    // job a answers slowly; its response lands only after b took over
    mock.set_status_delay("a", Duration::from_secs(5));
    mock.push_status("a", completed("a"));
    mock.push_status("b", processing("b", 10));
    mock.push_status("b", completed("b"));
    let ctl = controller(&mock);

    ctl.submit(paris(), options()).await.unwrap();
    // t=2: the tick for a goes out and hangs in flight
    tokio::time::sleep(Duration::from_secs(3)).await;
    let superseding = ctl.submit(paris(), options()).await.unwrap();
    assert_eq!(superseding, "b");
    assert_eq!(ctl.snapshot().unwrap().job.task_id, "b");

    let mut rx = ctl.subscribe();
    loop {
        let view = rx.borrow_and_update().clone().unwrap();
        assert_eq!(view.job.task_id, "b");
        if view.job.status == TaskStatus::Completed {
            break;
        }
        rx.changed().await.unwrap();
    }

    tokio::time::sleep(Duration::from_secs(20)).await;
    let view = ctl.snapshot().unwrap();
    assert_eq!(view.job.task_id, "b");
    assert_eq!(view.job.status, TaskStatus::Completed);
    // a was fetched exactly once and never again after supersession
    assert_eq!(mock.status_calls("a"), 1);
    assert_eq!(mock.status_calls("b"), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_discards_an_in_flight_response() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("t1");
    mock.set_status_delay("t1", Duration::from_secs(5));
    mock.push_status("t1", completed("t1"));
    let ctl = controller(&mock);

    ctl.submit(paris(), options()).await.unwrap();
    // t=2: fetch goes out; teardown lands while it is in flight
    tokio::time::sleep(Duration::from_secs(3)).await;
    ctl.shutdown();
    assert!(ctl.snapshot().is_none());

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(ctl.snapshot().is_none());
    assert_eq!(mock.status_calls("t1"), 1);
}

#[tokio::test(start_paused = true)]
async fn polling_is_bounded_by_the_wait_limit() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("t1");
    mock.push_status("t1", processing("t1", 10));
    let service: Arc<dyn GenerationService> = mock.clone();
    let ctl = JobController::with_config(
        service,
        PollConfig {
            interval: Duration::from_secs(2),
            max_wait: Some(Duration::from_secs(7)),
            max_consecutive_errors: None,
        },
    );

    ctl.submit(paris(), options()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(9)).await;

    let view = ctl.snapshot().unwrap();
    assert_eq!(view.job.status, TaskStatus::Failed);
    assert!(view.job.error.as_deref().unwrap_or("").contains("timed out"));
    // fetches at t=2,4,6; the t=8 tick hits the limit instead of fetching
    assert_eq!(mock.status_calls("t1"), 3);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(mock.status_calls("t1"), 3);
}

#[tokio::test(start_paused = true)]
async fn a_tick_transport_error_does_not_stop_the_loop() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("t1");
    mock.push_status_error("t1", "connection reset by peer");
    mock.push_status("t1", processing("t1", 50));
    mock.push_status("t1", completed("t1"));
    let ctl = controller(&mock);

    ctl.submit(paris(), options()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(7)).await;

    let view = ctl.snapshot().unwrap();
    assert_eq!(view.job.status, TaskStatus::Completed);
    assert_eq!(mock.status_calls("t1"), 3);
}

#[tokio::test(start_paused = true)]
async fn repeated_transport_errors_can_fail_the_job() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("t1");
    mock.push_status_error("t1", "connection refused");
    mock.push_status_error("t1", "connection refused");
    let service: Arc<dyn GenerationService> = mock.clone();
    let ctl = JobController::with_config(
        service,
        PollConfig {
            interval: Duration::from_secs(2),
            max_wait: None,
            max_consecutive_errors: Some(2),
        },
    );

    ctl.submit(paris(), options()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let view = ctl.snapshot().unwrap();
    assert_eq!(view.job.status, TaskStatus::Failed);
    assert!(view.job.error.as_deref().unwrap_or("").contains("unreachable"));
    assert_eq!(mock.status_calls("t1"), 2);
}

#[tokio::test(start_paused = true)]
async fn a_contract_violation_fails_the_job_with_a_generic_error() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("t1");
    // completed without a result payload
    mock.push_status(
        "t1",
        TaskStatusResponse {
            task_id: "t1".to_string(),
            status: TaskStatus::Completed,
            progress: 100,
            result: None,
            error: None,
        },
    );
    let ctl = controller(&mock);

    ctl.submit(paris(), options()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let view = ctl.snapshot().unwrap();
    assert_eq!(view.job.status, TaskStatus::Failed);
    assert!(view.job.result.is_none());
    assert!(view.job.error.is_some());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(mock.status_calls("t1"), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_input_is_rejected_before_the_wire() {
    let mock = Arc::new(MockGenerationService::new());
    let ctl = controller(&mock);

    let err = ctl
        .submit(
            LocationInput::Coordinates {
                city: "Paris".to_string(),
                country: "France".to_string(),
                latitude: "north-ish".to_string(),
                longitude: "2.3522".to_string(),
            },
            options(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Request(_)));
    assert!(mock.submitted().is_empty());
    assert!(ctl.snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn a_failed_submission_creates_no_job() {
    let mock = Arc::new(MockGenerationService::new());
    mock.fail_next_submit("backend is down");
    let ctl = controller(&mock);

    let err = ctl.submit(paris(), options()).await.unwrap_err();
    assert!(matches!(err, SubmitError::Service(_)));
    assert!(ctl.snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn a_failed_submission_leaves_the_active_job_polling() {
    let mock = Arc::new(MockGenerationService::new());
    mock.queue_task_id("a");
    mock.push_status("a", processing("a", 10));
    mock.push_status("a", completed("a"));
    let ctl = controller(&mock);

    ctl.submit(paris(), options()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    mock.fail_next_submit("backend is down");
    let err = ctl.submit(paris(), options()).await.unwrap_err();
    assert!(matches!(err, SubmitError::Service(_)));
    assert_eq!(ctl.snapshot().unwrap().job.task_id, "a");

    tokio::time::sleep(Duration::from_secs(6)).await;
    let view = ctl.snapshot().unwrap();
    assert_eq!(view.job.task_id, "a");
    assert_eq!(view.job.status, TaskStatus::Completed);
}
