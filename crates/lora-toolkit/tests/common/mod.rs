#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
};
use serde_json::Value;
use tokio::net::TcpListener;

/// One multipart part as received by the fake toolkit.
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Scripted stand-in for the job-execution service.
#[derive(Default)]
pub struct FakeToolkit {
    /// Per-job status codes; the last one repeats. Unknown jobs get 404.
    codes: Mutex<HashMap<String, VecDeque<u16>>>,
    pub polls: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<Vec<ReceivedPart>>>,
    pub upload_status: Mutex<Option<(u16, String)>>,
    pub poll_delay: Mutex<Option<Duration>>,
}

impl FakeToolkit {
    pub fn script(&self, job: &str, codes: &[u16]) {
        self.codes
            .lock()
            .unwrap()
            .insert(job.to_string(), codes.iter().copied().collect());
    }

    fn next_code(&self, job: &str) -> u16 {
        let mut codes = self.codes.lock().unwrap();
        match codes.get_mut(job) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().copied().unwrap_or(404),
            None => 404,
        }
    }
}

async fn get_zip(State(fake): State<Arc<FakeToolkit>>, Json(body): Json<Value>) -> StatusCode {
    let job = body["job_name"].as_str().unwrap_or_default().to_string();
    fake.polls.lock().unwrap().push(job.clone());

    let delay = *fake.poll_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    StatusCode::from_u16(fake.next_code(&job)).unwrap()
}

async fn put_jobs(
    State(fake): State<Arc<FakeToolkit>>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        parts.push(ReceivedPart {
            field: field_name,
            file_name,
            content_type,
            bytes,
        });
    }
    fake.uploads.lock().unwrap().push(parts);

    let (code, body) = fake
        .upload_status
        .lock()
        .unwrap()
        .clone()
        .unwrap_or((200, "queued".to_string()));
    (StatusCode::from_u16(code).unwrap(), body)
}

pub async fn spawn_toolkit(fake: Arc<FakeToolkit>) -> String {
    let router = Router::new()
        .route("/get_zip/", post(get_zip))
        .route("/put_jobs/", post(put_jobs))
        .with_state(fake);
    serve(router).await
}

/// Stand-in for the artifact retrieval service; records request bodies.
#[derive(Default)]
pub struct FakeFetchService {
    pub requests: Mutex<Vec<Value>>,
}

async fn get_file(
    State(fake): State<Arc<FakeFetchService>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    fake.requests.lock().unwrap().push(body);
    Json(serde_json::json!({"status": "success"}))
}

pub async fn spawn_fetch_service(fake: Arc<FakeFetchService>) -> String {
    let router = Router::new()
        .route("/get_file", post(get_file))
        .with_state(fake);
    serve(router).await
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
