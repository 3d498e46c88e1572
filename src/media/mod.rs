// Media processing on top of ffmpeg
//
// - Commands: argument vectors for each ffmpeg invocation
// - Processor: runs them through the process runner and checks the outputs

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::artifact::Artifact;
use crate::error::Result;

/// Media operations used by the export pipeline
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Cut `[start, end]` out of a video without re-encoding
    async fn trim_video(
        &self,
        video: &Artifact,
        output_path: &Path,
        start: f64,
        end: f64,
    ) -> Result<Artifact>;

    /// Burn subtitles into video frames
    async fn burn_subtitles(
        &self,
        video: &Artifact,
        subtitles: &Artifact,
        output_path: &Path,
    ) -> Result<Artifact>;

    /// Swap the audio track of a video
    async fn replace_audio(
        &self,
        video: &Artifact,
        audio: &Artifact,
        output_path: &Path,
    ) -> Result<Artifact>;

    /// Check if media processor is available
    async fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn version_info(&self) -> Result<String>;
}
