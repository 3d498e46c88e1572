//! HTTP handlers.

use axum::body::Body;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::config::PathsConfig;
use crate::error::AlimeError;
use crate::models::{
    ExportResponse, ExportVideoRequest, GetMediaRequest, ProcessQuery, SpokenText, TranslateRequest,
    TranslateResponse, TtsRequest, UploadResponse,
};
use crate::workflow::PendingUpload;
use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Multipart field carrying the uploaded media
const UPLOAD_FIELD: &str = "file";

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Accept a media upload, store its metadata and transcribe it.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|r| ApiError::bad_request(r.body_text()))?;

    let pending = loop {
        let mut field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
            .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let pending = state.workflow.prepare_upload(&file_name, &content_type).await?;

        if let Err(e) = save_field(&mut field, &pending).await {
            if let Err(cleanup) = tokio::fs::remove_file(&pending.path).await {
                warn!("Failed to remove partial upload {}: {}", pending.path.display(), cleanup);
            }
            return Err(e);
        }
        break pending;
    };

    state.workflow.register_upload(&pending).await?;
    let segments = state.workflow.transcribe(&pending.process_id).await?;

    Ok(Json(UploadResponse {
        success: true,
        process_id: pending.process_id,
        segments,
    }))
}

async fn save_field(field: &mut Field<'_>, pending: &PendingUpload) -> ApiResult<()> {
    let mut file = tokio::fs::File::create(&pending.path)
        .await
        .map_err(AlimeError::from)?;

    let mut written: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        file.write_all(&chunk).await.map_err(AlimeError::from)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(AlimeError::from)?;

    info!("Saved upload {} ({} bytes)", pending.path.display(), written);
    Ok(())
}

/// Translate a transcript and voice the translation.
pub async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> ApiResult<Json<TranslateResponse>> {
    let request = json_body(payload)?;
    let segments = state
        .workflow
        .translate(&request.process_id, &request.target_language)
        .await?;

    Ok(Json(TranslateResponse { segments }))
}

pub async fn export_video(
    State(state): State<AppState>,
    payload: Result<Json<ExportVideoRequest>, JsonRejection>,
) -> ApiResult<Json<ExportResponse>> {
    let request = json_body(payload)?;
    Ok(Json(state.workflow.export(&request).await?))
}

/// Voice free text.
pub async fn tts(
    State(state): State<AppState>,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> ApiResult<Json<SpokenText>> {
    let request = json_body(payload)?;
    Ok(Json(state.workflow.synthesize_text(&request.text, &request.language).await?))
}

/// Download the last export of a process id.
pub async fn download_subtitled_video(
    State(state): State<AppState>,
    query: Result<Query<ProcessQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query.map_err(|r| ApiError::bad_request(r.body_text()))?;
    let record = state.workflow.last_export(&query.process_id).await?;
    let path = state.workflow.paths().resolve(&record.file_path);

    file_response(&path, "application/octet-stream", true).await
}

/// Download a file below one of the allowed output prefixes.
pub async fn download_video(
    State(state): State<AppState>,
    payload: Result<Json<GetMediaRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = json_body(payload)?;
    let path = resolve_client_path(
        state.workflow.paths(),
        &request.file_path,
        &state.server.download_prefixes,
    )?;

    file_response(&path, "application/octet-stream", true).await
}

/// Stream a synthesized or separated audio file.
pub async fn stream_audio(
    State(state): State<AppState>,
    payload: Result<Json<GetMediaRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = json_body(payload)?;
    let path = resolve_client_path(
        state.workflow.paths(),
        &request.file_path,
        &state.server.audio_prefixes,
    )?;

    file_response(&path, "audio/wav", false).await
}

/// JSON 404 for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

/// Map a client-supplied relative path onto the working root.
///
/// The path must be relative, must not climb with `..`, and must start with
/// one of `prefixes`.
pub fn resolve_client_path(
    paths: &PathsConfig,
    requested: &str,
    prefixes: &[String],
) -> Result<PathBuf, AlimeError> {
    let normalized = requested.trim().replace('\\', "/");
    if normalized.is_empty() {
        return Err(AlimeError::InvalidRequest("No file specified".to_string()));
    }

    let relative = normalized.trim_start_matches("./");
    let escapes = Path::new(relative)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if normalized.starts_with('/') || escapes {
        return Err(AlimeError::PathNotAllowed(requested.to_string()));
    }

    if !prefixes.iter().any(|prefix| relative.starts_with(prefix.as_str())) {
        return Err(AlimeError::PathNotAllowed(requested.to_string()));
    }

    Ok(paths.resolve(relative))
}

async fn file_response(path: &Path, content_type: &'static str, attachment: bool) -> ApiResult<Response> {
    let missing = || AlimeError::FileNotFound(path.display().to_string());

    let metadata = tokio::fs::metadata(path).await.map_err(|_| missing())?;
    if !metadata.is_file() {
        return Err(missing().into());
    }
    let file = tokio::fs::File::open(path).await.map_err(AlimeError::from)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', ""))
        .unwrap_or_default();
    let disposition = if attachment {
        format!("attachment; filename=\"{}\"", file_name)
    } else {
        format!("inline; filename=\"{}\"", file_name)
    };

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, metadata.len().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> Vec<String> {
        vec!["output/".to_string()]
    }

    fn paths() -> PathsConfig {
        PathsConfig {
            root: PathBuf::from("/srv/alime"),
            ..PathsConfig::default()
        }
    }

    #[test]
    fn test_client_path_allowed() {
        let resolved = resolve_client_path(&paths(), "output/exported/a.mp4", &prefixes()).unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/alime/output/exported/a.mp4"));

        let dotted = resolve_client_path(&paths(), "./output/exported/a.mp4", &prefixes()).unwrap();
        assert_eq!(dotted, resolved);
    }

    #[test]
    fn test_client_path_rejected() {
        for requested in [
            "../data.db",
            "output/../data.db",
            "/etc/passwd",
            "output\\..\\data.db",
            "uploads/abc.mp4",
            "outputs/x.mp4",
        ] {
            assert!(
                matches!(
                    resolve_client_path(&paths(), requested, &prefixes()),
                    Err(AlimeError::PathNotAllowed(_))
                ),
                "{} should be rejected",
                requested
            );
        }

        assert!(matches!(
            resolve_client_path(&paths(), "  ", &prefixes()),
            Err(AlimeError::InvalidRequest(_))
        ));
    }
}
