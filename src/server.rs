//! HTTP surface of the service.
//!
//! | Route | Behavior |
//! |---|---|
//! | `GET /` | `200` JSON welcome message (liveness check) |
//! | `POST /generate/` | multipart field `file` → `200 image/gif` Ken Burns animation |
//!
//! Errors are JSON `{"detail": "..."}`: `400` for uploads that are not images
//! or not well-formed multipart, `413` for oversized bodies, `500` for
//! anything that fails while rendering. No partial GIF bytes are ever sent.
//!
//! CORS is fully open: the endpoint is public and unauthenticated.

use crate::config::ServiceConfig;
use crate::imaging::{ImageBackend, RenderError, RenderOptions, render_animation};
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Ken Burns GIF service. Use POST /generate/ to create a GIF.";

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidUpload(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("Server failed to process the image: {0}")]
    Render(#[from] RenderError),
    #[error("Server failed to process the image: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Render(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "GIF generation failed: {detail}");
        } else {
            tracing::warn!(status = status.as_u16(), "rejected upload: {detail}");
        }
        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::InvalidUpload(format!("Malformed upload: {}", err.body_text()))
        }
    }
}

/// Shared, read-only request context.
///
/// Built once at startup; handlers only ever read from it.
pub struct AppState<B> {
    backend: Arc<B>,
    options: Arc<RenderOptions>,
    max_upload_bytes: usize,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            options: Arc::clone(&self.options),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

impl<B> AppState<B> {
    pub fn new(backend: B, options: RenderOptions, max_upload_bytes: usize) -> Self {
        Self {
            backend: Arc::new(backend),
            options: Arc::new(options),
            max_upload_bytes,
        }
    }
}

/// Build the router with CORS, request tracing, and the upload size limit.
pub fn router<B>(state: AppState<B>) -> Router
where
    B: ImageBackend + Send + Sync + 'static,
{
    let max_upload_bytes = state.max_upload_bytes;
    Router::new()
        .route("/", get(root))
        .route("/generate/", post(generate::<B>))
        .route("/generate", post(generate::<B>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Welcome {
    message: &'static str,
}

async fn root() -> Json<Welcome> {
    Json(Welcome {
        message: WELCOME_MESSAGE,
    })
}

/// Declared content type of an upload is an image type.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("image/")
}

struct Upload {
    file_name: Option<String>,
    bytes: Bytes,
}

/// Pull the `file` field out of the multipart body.
///
/// The declared content type is checked before the field body is read.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_image_content_type(&content_type) {
            return Err(ApiError::InvalidUpload(format!(
                "File must be an image (got content type '{content_type}')."
            )));
        }

        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?;
        return Ok(Upload { file_name, bytes });
    }

    Err(ApiError::InvalidUpload(format!(
        "Missing multipart field '{UPLOAD_FIELD}'."
    )))
}

async fn generate<B>(
    State(state): State<AppState<B>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError>
where
    B: ImageBackend + Send + Sync + 'static,
{
    let upload = read_upload(&mut multipart).await?;
    let start = Instant::now();
    let upload_bytes = upload.bytes.len();

    let backend = Arc::clone(&state.backend);
    let options = Arc::clone(&state.options);
    let bytes = upload.bytes;
    let rendered =
        tokio::task::spawn_blocking(move || render_animation(backend.as_ref(), &bytes, &options))
            .await
            .map_err(|e| ApiError::Internal(format!("render task failed: {e}")))??;

    tracing::info!(
        file = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        upload_bytes,
        source_width = rendered.source.width,
        source_height = rendered.source.height,
        frames = rendered.frame_count(),
        gif_bytes = rendered.bytes.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "generated animation"
    );

    Ok(([(header::CONTENT_TYPE, "image/gif")], rendered.bytes).into_response())
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM.
pub async fn serve<B>(config: &ServiceConfig, backend: B) -> std::io::Result<()>
where
    B: ImageBackend + Send + Sync + 'static,
{
    let state = AppState::new(
        backend,
        config.render_options(),
        config.limits.max_upload_bytes,
    );
    let app = router(state);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "kenburns-test-boundary";

    fn multipart_request(field: &str, content_type: &str, body: &[u8]) -> Request<Body> {
        let mut payload = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        payload.extend_from_slice(body);
        payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/generate/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(payload))
            .unwrap()
    }

    fn mock_router(backend: MockBackend) -> Router {
        router(AppState::new(backend, RenderOptions::default(), 1024 * 1024))
    }

    async fn detail(response: Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["detail"].as_str().unwrap().to_string()
    }

    #[test]
    fn image_content_types() {
        assert!(is_image_content_type("image/png"));
        assert!(is_image_content_type("Image/JPEG"));
        assert!(!is_image_content_type("text/plain"));
        assert!(!is_image_content_type(""));
        assert!(!is_image_content_type("application/image"));
    }

    #[test]
    fn error_statuses() {
        assert_eq!(
            ApiError::InvalidUpload("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Render(RenderError::EncodeFailure("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Render(RenderError::InvalidConfig("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::PayloadTooLarge("x".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn render_errors_mention_processing_failure() {
        let err = ApiError::from(RenderError::InvalidImage("bad header".into()));
        let message = err.to_string();
        assert!(message.starts_with("Server failed to process the image"));
        assert!(message.contains("bad header"));
    }

    #[tokio::test]
    async fn generate_with_mock_backend_returns_gif() {
        let app = mock_router(MockBackend::with_dimensions(1000, 500));
        let response = app
            .oneshot(multipart_request("file", "image/png", b"fake"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"GIF89a");
    }

    #[tokio::test]
    async fn encode_failure_is_500() {
        let app = mock_router(MockBackend::failing_encode(1000, 500));
        let response = app
            .oneshot(multipart_request("file", "image/png", b"fake"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(detail(response).await.contains("encode"));
    }

    #[tokio::test]
    async fn missing_file_field_is_400() {
        let app = mock_router(MockBackend::with_dimensions(10, 10));
        let response = app
            .oneshot(multipart_request("image", "image/png", b"fake"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(detail(response).await.contains("file"));
    }

    #[tokio::test]
    async fn non_image_is_rejected_before_decode() {
        let backend = MockBackend::with_dimensions(10, 10);
        let state = AppState::new(backend, RenderOptions::default(), 1024);
        let backend = Arc::clone(&state.backend);
        let response = router(state)
            .oneshot(multipart_request("file", "text/plain", b"hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(backend.get_operations().is_empty());
    }

    #[tokio::test]
    async fn generate_without_trailing_slash() {
        let app = mock_router(MockBackend::with_dimensions(640, 480));
        let mut request = multipart_request("file", "image/jpeg", b"fake");
        *request.uri_mut() = "/generate".parse().unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
