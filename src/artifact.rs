//! Typed references to files produced and consumed by pipeline stages.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{AlimeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Uploaded media whose streams are not known (audio or video)
    Media,
    Video,
    Audio,
    /// Transcript JSON with a `segments` array
    Transcript,
    Subtitles,
    /// Directory of per-segment voice clips with an `audio_info.json` index
    SpeechDir,
}

impl ArtifactKind {
    /// Whether an artifact of this kind can be used where `wanted` is expected.
    pub fn satisfies(self, wanted: ArtifactKind) -> bool {
        self == wanted
            || (wanted == ArtifactKind::Media
                && matches!(self, ArtifactKind::Video | ArtifactKind::Audio))
            || (self == ArtifactKind::Media && wanted == ArtifactKind::Video)
    }

    fn is_directory(self) -> bool {
        self == ArtifactKind::SpeechDir
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Media => "media",
            ArtifactKind::Video => "video",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Transcript => "transcript",
            ArtifactKind::Subtitles => "subtitles",
            ArtifactKind::SpeechDir => "speech directory",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    path: PathBuf,
    kind: ArtifactKind,
}

impl Artifact {
    /// Wrap a path a tool was expected to produce, failing if it is absent.
    pub async fn produced<P: Into<PathBuf>>(path: P, kind: ArtifactKind) -> Result<Self> {
        let path = path.into();
        let present = match fs::metadata(&path).await {
            Ok(meta) => meta.is_dir() == kind.is_directory(),
            Err(_) => false,
        };

        if !present {
            return Err(AlimeError::MissingArtifact(format!(
                "{} {}",
                kind,
                path.display()
            )));
        }

        Ok(Self { path, kind })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Check the artifact at a stage boundary and hand out its path.
    pub fn expect(&self, wanted: ArtifactKind) -> Result<&Path> {
        if self.kind.satisfies(wanted) {
            Ok(&self.path)
        } else {
            Err(AlimeError::ArtifactKind {
                path: self.path.display().to_string(),
                actual: self.kind.to_string(),
                expected: wanted.to_string(),
            })
        }
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Dotted extension, empty when the file has none.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }
}

/// Remove an output left behind by an earlier run so a later existence
/// check proves the current invocation produced it.
pub async fn clear_stale(path: &Path) -> Result<()> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await?,
        Ok(_) => fs::remove_file(path).await?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
