//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    download_subtitled_video, download_video, export_video, health, not_found, stream_audio,
    translate, tts, upload,
};
use super::middleware::{cors_layer, request_span};
use super::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/upload", post(upload))
        .route("/translate", post(translate))
        .route("/export-video", post(export_video))
        .route("/download-subtitled-video", get(download_subtitled_video))
        .route("/download-video", post(download_video))
        .route("/tts", post(tts))
        .route("/stream-audio", post(stream_audio));

    let paths = state.workflow.paths();
    let public_dir = ServeDir::new(paths.resolve(&paths.public));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .nest_service("/public", public_dir)
        .fallback(not_found)
        // Uploads are bounded by the configured limit rather than axum's 2 MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.server.max_body_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(&state.server.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::runner::{MockProcessRunner, ProcessOutput};
    use crate::store::Store;
    use crate::workflow::Workflow;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "alime-test-boundary";

    /// Runner that only knows how to transcribe.
    fn transcribing_runner() -> MockProcessRunner {
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_, args| {
            let flag = args.iter().position(|a| a == "--output-path").unwrap();
            let output = Path::new(&args[flag + 1]).join(format!("{}.json", args[flag + 3]));
            std::fs::write(
                output,
                r#"{"segments": [{"id": 0, "start": 0.0, "end": 1.5, "text": "Hello there"}]}"#,
            )
            .unwrap();
            Ok(ProcessOutput::default())
        });
        runner
    }

    fn app(root: &Path) -> Router {
        let mut config = Config::default();
        config.paths.root = root.to_path_buf();
        let workflow = Workflow::new(
            config.clone(),
            Arc::new(Store::in_memory().unwrap()),
            Arc::new(transcribing_runner()),
        );
        create_router(AppState::new(config.server, workflow))
    }

    fn json_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(file_name: &str, content_type: &str, data: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {c}\r\n\r\n{d}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = file_name,
            c = content_type,
            d = data,
        );
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/api/nothing-here").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn test_upload_transcribes() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(multipart_request("My Clip.mp4", "video/mp4", "fake video"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["segments"][0]["text"], "Hello there");

        let process_id = body["processId"].as_str().unwrap();
        let saved = dir.path().join("uploads").join(format!("{}.mp4", process_id));
        assert_eq!(std::fs::read_to_string(saved).unwrap(), "fake video");
    }

    #[tokio::test]
    async fn test_upload_rejects_images() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(multipart_request("cat.png", "image/png", "png"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let uploads = dir.path().join("uploads");
        assert!(!uploads.exists() || std::fs::read_dir(uploads).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_export_unknown_process() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(json_request(
                "/api/export-video",
                r#"{"processId": "missing", "segments": [], "language": "vi"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(json_request("/api/export-video", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_download_video() {
        let dir = tempfile::tempdir().unwrap();
        let exported: PathBuf = dir.path().join("output/exported/clip_final.mp4");
        std::fs::create_dir_all(exported.parent().unwrap()).unwrap();
        std::fs::write(&exported, b"exported video").unwrap();
        let app = app(dir.path());

        let response = app
            .clone()
            .oneshot(json_request(
                "/api/download-video",
                r#"{"filepath": "output/exported/clip_final.mp4"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("clip_final.mp4"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"exported video");

        let traversal = app
            .clone()
            .oneshot(json_request("/api/download-video", r#"{"filepath": "output/../data.db"}"#))
            .await
            .unwrap();
        assert_eq!(traversal.status(), StatusCode::BAD_REQUEST);

        let missing = app
            .oneshot(json_request("/api/download-video", r#"{"filepath": "output/exported/none.mp4"}"#))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stream_audio_limited_to_audio_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(json_request("/api/stream-audio", r#"{"filepath": "uploads/abc.wav"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_download_subtitled_video_unknown_process() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::get("/api/download-subtitled-video?processId=missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_public_files_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("public")).unwrap();
        std::fs::write(dir.path().join("public/index.html"), "<h1>alime</h1>").unwrap();

        let response = app(dir.path())
            .oneshot(Request::get("/public/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
