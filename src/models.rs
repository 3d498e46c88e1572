//! Request, response and artifact payloads shared by the pipeline and the HTTP layer.
//!
//! Field names follow the JSON contract of the web client and the scripts,
//! which mixes camelCase and lowercase keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Metadata of an uploaded media file, stored under its process id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStorageData {
    #[serde(rename = "filename")]
    pub file_name: String,
    #[serde(rename = "fileExt")]
    pub file_ext: String,
    #[serde(rename = "fileFullName")]
    pub file_full_name: String,
    #[serde(rename = "fileUniqueName")]
    pub file_unique_name: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
}

impl MediaStorageData {
    /// Build the record for an upload saved as `<upload_dir>/<process_id><ext>`.
    pub fn new(process_id: &str, original_name: &str, upload_dir: &str) -> Self {
        let (file_name, file_ext) = split_file_name(original_name);
        let file_unique_name = format!("{}{}", process_id, file_ext);
        let file_path = format!("{}/{}", upload_dir.trim_end_matches('/'), file_unique_name);

        Self {
            file_full_name: format!("{}{}", file_name, file_ext),
            file_name,
            file_ext,
            file_unique_name,
            file_path,
        }
    }
}

/// Split a client-supplied file name into stem and dotted extension.
/// Directory components are discarded.
pub fn split_file_name(name: &str) -> (String, String) {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let path = Path::new(&base);

    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    (stem, ext)
}

/// A timed transcript unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(alias = "ID")]
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Segment {
    pub fn new<S: Into<String>>(id: i64, start: f64, end: f64, text: S) -> Self {
        Self {
            id,
            start,
            end,
            text: text.into(),
            language: None,
        }
    }

    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Move segments onto the timeline of a clip cut from `start` to `end`.
///
/// Segments entirely outside the window are dropped; the rest are clamped to
/// the window and shifted so the clip starts at zero.
pub fn rebase_segments(segments: &[Segment], start: f64, end: f64) -> Vec<Segment> {
    segments
        .iter()
        .filter(|s| s.end > start && s.start < end)
        .map(|s| {
            let mut shifted = s.clone();
            shifted.start = s.start.max(start) - start;
            shifted.end = s.end.min(end) - start;
            shifted
        })
        .collect()
}

/// Transcript file as written by the transcription and translation scripts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_probability: Option<f64>,
}

impl Transcript {
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            ..Self::default()
        }
    }

    /// Parse transcript JSON, tolerating a leading UTF-8 byte order mark.
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        Ok(serde_json::from_str(content)?)
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }
}

/// Segment joined with its synthesized voice clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSegment {
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(rename = "audioLength")]
    pub audio_length: f64,
    #[serde(rename = "audioPath")]
    pub audio_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportVideoRequest {
    #[serde(rename = "processId")]
    pub process_id: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub language: String,
    #[serde(rename = "isShowCaption", default)]
    pub is_show_caption: bool,
    #[serde(rename = "isAppendTTS", default)]
    pub is_append_tts: bool,
    #[serde(rename = "isTrimVideo", default)]
    pub is_trim_video: bool,
    #[serde(rename = "trimStart", default)]
    pub trim_start: f64,
    #[serde(rename = "trimEnd", default)]
    pub trim_end: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateRequest {
    #[serde(rename = "processId")]
    pub process_id: String,
    #[serde(rename = "targetLanguage")]
    pub target_language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetMediaRequest {
    #[serde(rename = "filepath")]
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessQuery {
    #[serde(rename = "processId")]
    pub process_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(rename = "processId")]
    pub process_id: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslateResponse {
    pub segments: Vec<SpeechSegment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResponse {
    pub file_path: String,
    pub stages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpokenText {
    #[serde(rename = "outputFile")]
    pub output_file: String,
    pub length: f64,
}

/// Result of the last successful export of a process id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub stages: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ExportRecord {
    pub fn key(process_id: &str) -> String {
        format!("export:{}", process_id)
    }
}
