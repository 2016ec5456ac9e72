//! HTTP surface for the archive backend.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `GET /` – Health/welcome message.
//! - `POST /upload/` – Accept a multipart file, persist it under the uploads
//!   directory, and enqueue the background processing job. Returns
//!   `{filename, status: "uploaded", task_id}` before processing completes.
//! - `GET /tasks/{task_id}` – Poll a background job: `{task_id, status, result}`
//!   where `result` stays null until the task reaches a terminal state.
//! - `POST /chat/` – Answer a question scoped to one uploaded document.
//! - `GET /metrics` – Observe document and question counters.
//!
//! Endpoints return standard success envelopes even when downstream AI steps
//! degrade to placeholders; only a missing upload or an unreachable backend
//! surfaces as a failed call. A permissive CORS layer is applied so browser
//! frontends can call the API cross-origin.

use crate::metrics::MetricsSnapshot;
use crate::pipeline::{ArchiveApi, ProcessingError};
use crate::tasks::{TaskRegistry, TaskSnapshot, TaskStatus};
use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Shared state handed to every handler.
pub struct AppState<S> {
    service: Arc<S>,
    tasks: TaskRegistry,
    uploads_dir: String,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            tasks: self.tasks.clone(),
            uploads_dir: self.uploads_dir.clone(),
        }
    }
}

/// Build the HTTP router exposing the upload, task, and chat endpoints.
pub fn create_router<S>(service: Arc<S>, tasks: TaskRegistry, uploads_dir: String) -> Router
where
    S: ArchiveApi + 'static,
{
    let state = AppState {
        service,
        tasks,
        uploads_dir,
    };

    // Browser frontends call these endpoints cross-origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(read_root))
        .route("/upload/", post(upload_document::<S>))
        .route("/tasks/:task_id", get(get_task_status::<S>))
        .route("/chat/", post(chat_with_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(cors)
        .with_state(state)
}

/// Health/welcome endpoint.
async fn read_root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the IntelliArchive API" }))
}

/// Success response for the `POST /upload/` endpoint.
#[derive(Serialize)]
struct UploadResponse {
    /// Sanitized filename the document was stored under.
    filename: String,
    /// Fixed status marker; processing continues in the background.
    status: &'static str,
    /// Identifier for polling the processing job.
    task_id: String,
}

/// Accept a multipart upload, persist it, and enqueue processing.
async fn upload_document<S>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: ArchiveApi + 'static,
{
    let mut stored: Option<(String, axum::body::Bytes)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = sanitize_filename(field.file_name().unwrap_or("document"));
        let data = field
            .bytes()
            .await
            .map_err(|error| AppError::BadRequest(error.to_string()))?;
        stored = Some((filename, data));
        break;
    }

    let (filename, data) =
        stored.ok_or_else(|| AppError::BadRequest("missing 'file' field".to_string()))?;

    let file_location = format!("{}/{}", state.uploads_dir.trim_end_matches('/'), filename);
    tokio::fs::create_dir_all(&state.uploads_dir)
        .await
        .map_err(AppError::Io)?;
    tokio::fs::write(&file_location, &data)
        .await
        .map_err(AppError::Io)?;

    let service = state.service.clone();
    let job_path = file_location.clone();
    let task_id = state.tasks.spawn(async move {
        service
            .process_document(job_path)
            .await
            .map_err(|error| error.to_string())
    });

    tracing::info!(
        filename = %filename,
        path = %file_location,
        task_id = %task_id,
        bytes = data.len(),
        "Document uploaded; processing enqueued"
    );

    Ok(Json(UploadResponse {
        filename,
        status: "uploaded",
        task_id: task_id.to_string(),
    }))
}

/// Poll the status and result of a background processing job.
async fn get_task_status<S>(
    State(state): State<AppState<S>>,
    Path(task_id): Path<String>,
) -> Json<TaskSnapshot>
where
    S: ArchiveApi,
{
    let snapshot = match Uuid::parse_str(&task_id) {
        Ok(id) => state.tasks.snapshot(id).await,
        // Unknown/garbled ids poll as pending, matching broker semantics.
        Err(_) => TaskSnapshot {
            task_id,
            status: TaskStatus::Pending,
            result: None,
        },
    };
    Json(snapshot)
}

/// Request body for the `POST /chat/` endpoint.
#[derive(Deserialize)]
struct ChatRequest {
    /// Free-text question to answer.
    query: String,
    /// Filename of the uploaded document to scope retrieval to.
    filename: String,
}

/// Success response for the `POST /chat/` endpoint.
#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

/// Answer a question about a single uploaded document.
async fn chat_with_document<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError>
where
    S: ArchiveApi,
{
    let filename = sanitize_filename(&request.filename);
    // Must match the exact path chunks were stamped with during ingestion.
    let file_path = format!("{}/{}", state.uploads_dir.trim_end_matches('/'), filename);
    let answer = state
        .service
        .answer_question(&request.query, &file_path)
        .await?;
    Ok(Json(ChatResponse { answer }))
}

/// Report the processing counters accumulated since startup.
async fn get_metrics<S>(State(state): State<AppState<S>>) -> Json<MetricsSnapshot>
where
    S: ArchiveApi,
{
    Json(state.service.metrics_snapshot())
}

/// Strip any path components from a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    std::path::Path::new(name)
        .file_name()
        .and_then(|value| value.to_str())
        .filter(|value| !value.trim().is_empty())
        .unwrap_or("document")
        .to_string()
}

enum AppError {
    BadRequest(String),
    Io(std::io::Error),
    Processing(ProcessingError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Io(error) => {
                tracing::error!(error = %error, "Upload storage failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            }
            Self::Processing(error) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            }
        }
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskRegistry;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::Value;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Clone, Debug)]
    struct ChatCall {
        query: String,
        source: String,
    }

    struct StubArchiveService {
        chat_calls: Arc<Mutex<Vec<ChatCall>>>,
        processed: Arc<Mutex<Vec<String>>>,
        answer: String,
        job_result: Result<Value, String>,
    }

    impl StubArchiveService {
        fn new(answer: &str, job_result: Result<Value, String>) -> Self {
            Self {
                chat_calls: Arc::new(Mutex::new(Vec::new())),
                processed: Arc::new(Mutex::new(Vec::new())),
                answer: answer.to_string(),
                job_result,
            }
        }
    }

    #[async_trait]
    impl ArchiveApi for StubArchiveService {
        async fn process_document(&self, path: String) -> Result<Value, ProcessingError> {
            self.processed.lock().await.push(path);
            match &self.job_result {
                Ok(value) => Ok(value.clone()),
                Err(message) => Err(ProcessingError::Loader(
                    crate::loader::LoaderError::NotFound(message.clone()),
                )),
            }
        }

        async fn answer_question(
            &self,
            query: &str,
            source: &str,
        ) -> Result<String, ProcessingError> {
            self.chat_calls.lock().await.push(ChatCall {
                query: query.to_string(),
                source: source.to_string(),
            });
            Ok(self.answer.clone())
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_processed: 3,
                chunks_indexed: 12,
                questions_answered: 2,
            }
        }
    }

    fn build_app(service: Arc<StubArchiveService>, uploads_dir: String) -> Router {
        create_router(service, TaskRegistry::new(), uploads_dir)
    }

    fn multipart_body(filename: &str, content: &str) -> (String, Vec<u8>) {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\ncontent-disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\ncontent-type: text/plain\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        (
            format!("multipart/form-data; boundary={boundary}"),
            body.into_bytes(),
        )
    }

    async fn response_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn root_returns_welcome_message() {
        let service = Arc::new(StubArchiveService::new("", Ok(json!({}))));
        let app = build_app(service, "uploads".into());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert!(json["message"].as_str().expect("message").contains("IntelliArchive"));
    }

    #[tokio::test]
    async fn upload_stores_file_and_returns_task_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads_dir = dir.path().to_str().expect("utf8").to_string();
        let service = Arc::new(StubArchiveService::new(
            "",
            Ok(json!({ "summary": "done", "tags": ["Invoice"] })),
        ));
        let app = build_app(service.clone(), uploads_dir.clone());

        let (content_type, body) = multipart_body("sample.txt", "Total Amount: $500.00");
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload/")
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["filename"], "sample.txt");
        assert_eq!(json["status"], "uploaded");
        assert!(Uuid::parse_str(json["task_id"].as_str().expect("task id")).is_ok());

        let stored = std::fs::read_to_string(format!("{uploads_dir}/sample.txt"))
            .expect("stored file");
        assert_eq!(stored, "Total Amount: $500.00");

        // the enqueued job receives the stored path
        tokio::time::sleep(Duration::from_millis(50)).await;
        let processed = service.processed.lock().await.clone();
        assert_eq!(processed, vec![format!("{uploads_dir}/sample.txt")]);
    }

    #[tokio::test]
    async fn upload_sanitizes_path_traversal_in_filename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads_dir = dir.path().to_str().expect("utf8").to_string();
        let service = Arc::new(StubArchiveService::new("", Ok(json!({}))));
        let app = build_app(service, uploads_dir.clone());

        let (content_type, body) = multipart_body("../../etc/passwd", "nope");
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload/")
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["filename"], "passwd");
        assert!(std::path::Path::new(&format!("{uploads_dir}/passwd")).exists());
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let service = Arc::new(StubArchiveService::new("", Ok(json!({}))));
        let app = build_app(service, "uploads".into());

        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\ncontent-disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload/")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn task_endpoint_reports_success_result_after_completion() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads_dir = dir.path().to_str().expect("utf8").to_string();
        let service = Arc::new(StubArchiveService::new(
            "",
            Ok(json!({ "summary": "Short summary.", "tags": ["Invoice"], "text_preview": "..." })),
        ));
        let app = build_app(service, uploads_dir);

        let (content_type, body) = multipart_body("sample.txt", "content");
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload/")
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");
        let task_id = response_json(response).await["task_id"]
            .as_str()
            .expect("task id")
            .to_string();

        let mut last = Value::Null;
        for _ in 0..100 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri(format!("/tasks/{task_id}"))
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("response");
            last = response_json(response).await;
            if last["status"] != "PENDING" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(last["status"], "SUCCESS");
        assert_eq!(last["task_id"], task_id);
        assert_eq!(last["result"]["tags"], json!(["Invoice"]));
    }

    #[tokio::test]
    async fn task_endpoint_reports_unknown_id_as_pending() {
        let service = Arc::new(StubArchiveService::new("", Ok(json!({}))));
        let app = build_app(service, "uploads".into());

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/tasks/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["result"], Value::Null);
    }

    #[tokio::test]
    async fn chat_scopes_question_to_uploaded_document_path() {
        let service = Arc::new(StubArchiveService::new(
            "The total amount is $500.00.",
            Ok(json!({})),
        ));
        let app = build_app(service.clone(), "uploads".into());

        let payload = json!({
            "query": "What is the total amount?",
            "filename": "sample.txt"
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/chat/")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["answer"], "The total amount is $500.00.");

        let calls = service.chat_calls.lock().await.clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, "What is the total amount?");
        assert_eq!(calls[0].source, "uploads/sample.txt");
    }

    #[tokio::test]
    async fn responses_carry_cors_headers_for_browser_clients() {
        let service = Arc::new(StubArchiveService::new("", Ok(json!({}))));
        let app = build_app(service, "uploads".into());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", "http://localhost:5173")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let allow_origin = response
            .headers()
            .get("access-control-allow-origin")
            .expect("cors header");
        assert_eq!(allow_origin, "*");
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_counters() {
        let service = Arc::new(StubArchiveService::new("", Ok(json!({}))));
        let app = build_app(service, "uploads".into());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["documents_processed"], 3);
        assert_eq!(json["chunks_indexed"], 12);
        assert_eq!(json["questions_answered"], 2);
    }

    #[test]
    fn sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../secret.txt"), "secret.txt");
        assert_eq!(sanitize_filename("a/b/c.txt"), "c.txt");
        assert_eq!(sanitize_filename(""), "document");
    }
}
