use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::artifact::{clear_stale, Artifact, ArtifactKind};
use crate::config::MediaConfig;
use crate::error::{AlimeError, Result};
use crate::runner::ProcessRunner;
use super::{MediaCommand, MediaCommandBuilder, MediaProcessor};

/// ffmpeg-backed media processor
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
    runner: Arc<dyn ProcessRunner>,
}

impl FfmpegProcessor {
    /// Create a new media processor running ffmpeg through `runner`
    pub fn new(config: MediaConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
            runner,
        }
    }

    /// Run a command whose single output file must exist afterwards
    async fn produce(&self, command: MediaCommand, output_path: &Path, kind: ArtifactKind) -> Result<Artifact> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        clear_stale(output_path).await?;

        command.execute(self.runner.as_ref()).await?;
        Artifact::produced(output_path, kind).await
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn trim_video(
        &self,
        video: &Artifact,
        output_path: &Path,
        start: f64,
        end: f64,
    ) -> Result<Artifact> {
        let video_path = video.expect(ArtifactKind::Video)?;
        if !(start >= 0.0 && end > start) {
            return Err(AlimeError::InvalidRequest(format!(
                "invalid trim window {:.2}..{:.2}",
                start, end
            )));
        }

        info!("Trimming {} ({:.2}s to {:.2}s) -> {}",
              video_path.display(), start, end, output_path.display());

        let command = self.command_builder.trim(video_path, output_path, start, end);
        let artifact = self.produce(command, output_path, ArtifactKind::Video).await?;

        info!("Trim completed");
        Ok(artifact)
    }

    async fn burn_subtitles(
        &self,
        video: &Artifact,
        subtitles: &Artifact,
        output_path: &Path,
    ) -> Result<Artifact> {
        let video_path = video.expect(ArtifactKind::Video)?;
        let subtitle_path = subtitles.expect(ArtifactKind::Subtitles)?;

        info!("Embedding subtitles from {} into {} -> {}",
              subtitle_path.display(), video_path.display(), output_path.display());

        let command = self.command_builder.burn_subtitles(
            video_path,
            subtitle_path,
            output_path,
            &self.config.subtitle_options,
        );
        let artifact = self.produce(command, output_path, ArtifactKind::Video).await?;

        info!("Subtitle embedding completed successfully");
        Ok(artifact)
    }

    async fn replace_audio(
        &self,
        video: &Artifact,
        audio: &Artifact,
        output_path: &Path,
    ) -> Result<Artifact> {
        let video_path = video.expect(ArtifactKind::Video)?;
        let audio_path = audio.expect(ArtifactKind::Audio)?;

        info!("Replacing audio of {} with {} -> {}",
              video_path.display(), audio_path.display(), output_path.display());

        let command = self.command_builder.replace_audio(
            video_path,
            audio_path,
            output_path,
            self.config.volume_gain,
        );
        let artifact = self.produce(command, output_path, ArtifactKind::Video).await?;

        info!("Audio replacement completed");
        Ok(artifact)
    }

    async fn check_availability(&self) -> Result<()> {
        self.version_info().await.map(|_| {
            info!("Media processor is available");
        })
    }

    async fn version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let output = self
            .command_builder
            .version_check()
            .execute(self.runner.as_ref())
            .await
            .map_err(|e| AlimeError::Media(format!("Media processor not available: {}", e)))?;

        // The first line carries the version
        Ok(output
            .combined
            .lines()
            .next()
            .unwrap_or("Unknown version")
            .to_string())
    }
}
