mod common;

use std::{sync::Arc, time::Duration};

use common::{FakeFetchService, FakeToolkit, dead_url, spawn_fetch_service, spawn_toolkit};
use lora_core::{
    MemoryTaskStore, Overrides, ReconciliationScheduler, SchedulerConfig, StatusReconciler,
    TaskStore, TrainingSubmitter,
};
use lora_model::{NewTask, Task, TaskId, TaskStatus, UploadFile};
use lora_toolkit::{ArtifactFetchTrigger, FetchConfig, ToolkitClient, ToolkitConfig};
use tokio_util::sync::CancellationToken;

const CONFIG: &str = "\
job: extension
config:
  name: template
  process:
    - type: sd_trainer
      train:
        steps: 100
      save:
        dtype: float32
";

struct Harness {
    store: MemoryTaskStore,
    toolkit: Arc<FakeToolkit>,
    fetch: Arc<FakeFetchService>,
    submitter: TrainingSubmitter<ToolkitClient>,
    scheduler: ReconciliationScheduler<ToolkitClient, ArtifactFetchTrigger>,
}

async fn harness(config: SchedulerConfig) -> Harness {
    let toolkit = Arc::new(FakeToolkit::default());
    let fetch = Arc::new(FakeFetchService::default());
    let toolkit_url = spawn_toolkit(Arc::clone(&toolkit)).await;
    let fetch_url = spawn_fetch_service(Arc::clone(&fetch)).await;

    let client = ToolkitClient::new(&ToolkitConfig {
        base_url: toolkit_url.clone(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap();
    let trigger = ArtifactFetchTrigger::new(
        client.http(),
        FetchConfig {
            service_url: fetch_url,
            database_url: "memory://tasks".to_string(),
            toolkit_url,
            timeout: Duration::from_secs(5),
        },
    );

    let store = MemoryTaskStore::new();
    let client = Arc::new(client);
    let submitter = TrainingSubmitter::new(Arc::clone(&client), Arc::new(store.clone()));
    let reconciler = StatusReconciler::new(client, Arc::new(trigger));
    let scheduler = ReconciliationScheduler::new(Arc::new(store.clone()), reconciler, config);

    Harness {
        store,
        toolkit,
        fetch,
        submitter,
        scheduler,
    }
}

fn load(store: &MemoryTaskStore, id: TaskId) -> Task {
    store.session().unwrap().get(id).unwrap().unwrap()
}

fn uploads() -> Vec<UploadFile> {
    vec![
        UploadFile::new("lora.yaml", CONFIG),
        UploadFile::new("cat.png", vec![0x89, b'P', b'N', b'G']),
    ]
}

#[tokio::test]
async fn submitted_job_walks_to_artifact_ready() {
    let h = harness(SchedulerConfig::default()).await;
    h.toolkit.script("lora-run-1", &[201, 200]);

    let task = h
        .submitter
        .submit("Model A", "lora-run-1", uploads(), &Overrides::new())
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(h.toolkit.uploads.lock().unwrap().len(), 1);

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.transitioned, 1);
    assert_eq!(load(&h.store, task.id).status, TaskStatus::Training);
    assert!(h.fetch.requests.lock().unwrap().is_empty());

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.transitioned, 1);
    assert_eq!(load(&h.store, task.id).status, TaskStatus::RunBefore);

    // No longer active: not polled again, no second notification.
    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.loaded, 0);

    let requests = h.fetch.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["task_id"], task.id.get());
    assert_eq!(h.toolkit.polls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_submission_leaves_store_untouched() {
    let h = harness(SchedulerConfig::default()).await;

    h.submitter
        .submit("Model A", "lora-run-1", uploads(), &Overrides::new())
        .await
        .unwrap();
    let err = h
        .submitter
        .submit("Model A", "lora-run-1", uploads(), &Overrides::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "a task named 'lora-run-1' already exists");
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.toolkit.uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn vanished_job_fails_task() {
    let h = harness(SchedulerConfig::default()).await;
    let task = h
        .submitter
        .submit("Model A", "gone", uploads(), &Overrides::new())
        .await
        .unwrap();

    // Unscripted jobs answer 404.
    h.scheduler.run_cycle().await;

    assert_eq!(load(&h.store, task.id).status, TaskStatus::Failed);
    assert!(h.fetch.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_toolkit_fails_active_tasks() {
    let fetch = Arc::new(FakeFetchService::default());
    let fetch_url = spawn_fetch_service(Arc::clone(&fetch)).await;
    let toolkit_url = dead_url().await;

    let client = ToolkitClient::new(&ToolkitConfig {
        base_url: toolkit_url.clone(),
        request_timeout: Duration::from_secs(2),
    })
    .unwrap();
    let trigger = ArtifactFetchTrigger::new(
        client.http(),
        FetchConfig {
            service_url: fetch_url,
            database_url: "memory://tasks".to_string(),
            toolkit_url,
            timeout: Duration::from_secs(2),
        },
    );

    let store = MemoryTaskStore::new();
    let session = store.session().unwrap();
    let pending = session
        .create(NewTask::new("lora-run-1", serde_json::json!({})))
        .unwrap();
    let training = session
        .create(NewTask::new("lora-run-2", serde_json::json!({})))
        .unwrap();
    session
        .transition(training.id, TaskStatus::Pending, TaskStatus::Training)
        .unwrap();

    let reconciler = StatusReconciler::new(Arc::new(client), Arc::new(trigger));
    let scheduler =
        ReconciliationScheduler::new(Arc::new(store.clone()), reconciler, SchedulerConfig::default());

    let report = scheduler.run_cycle().await;

    assert_eq!(report.transitioned, 2);
    assert_eq!(load(&store, pending.id).status, TaskStatus::Failed);
    assert_eq!(load(&store, training.id).status, TaskStatus::Failed);
    assert!(fetch.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn background_loop_reaches_artifact_ready_and_stops() {
    let config = SchedulerConfig {
        interval: Duration::from_millis(20),
        ..Default::default()
    };
    let Harness {
        store,
        toolkit,
        fetch,
        submitter,
        scheduler,
    } = harness(config).await;
    toolkit.script("lora-run-2", &[201, 201, 200]);

    let task = submitter
        .submit("Model B", "lora-run-2", uploads(), &Overrides::new())
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(scheduler.run(cancel.clone()));

    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while load(&store, task.id).status != TaskStatus::RunBefore {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    cancel.cancel();
    handle.await.unwrap();

    assert!(reached.is_ok(), "task never reached run_before");
    assert_eq!(fetch.requests.lock().unwrap().len(), 1);
    assert_eq!(toolkit.polls.lock().unwrap().len(), 3);
}
