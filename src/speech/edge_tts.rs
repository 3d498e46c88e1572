use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::artifact::{clear_stale, Artifact, ArtifactKind};
use crate::config::SpeechConfig;
use crate::error::{AlimeError, Result};
use crate::runner::ScriptContext;
use crate::translate::Language;
use super::{SpeechSynthesizer, SpokenAudio, AUDIO_INFO_FILE};

/// edge-tts script back-end.
///
/// `context.output_dir` is where the free-text script writes, which the
/// script hardcodes relative to its working directory.
pub struct EdgeTtsSynthesizer {
    config: SpeechConfig,
    context: ScriptContext,
}

impl EdgeTtsSynthesizer {
    pub fn new(config: SpeechConfig, context: ScriptContext) -> Self {
        Self { config, context }
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsSynthesizer {
    async fn synthesize_segments(
        &self,
        transcript: &Artifact,
        language: &Language,
        output_dir: &Path,
    ) -> Result<Artifact> {
        let transcript_path = transcript.expect(ArtifactKind::Transcript)?;
        info!("Synthesizing {} speech for {}", language.name, transcript_path.display());

        // Clips from an earlier run would survive in the index otherwise
        clear_stale(output_dir).await?;
        tokio::fs::create_dir_all(output_dir).await?;

        let args = vec![
            self.config.segments_script.clone(),
            transcript_path.to_string_lossy().to_string(),
            "--language".to_string(),
            language.code.to_string(),
            "--output".to_string(),
            output_dir.to_string_lossy().to_string(),
        ];
        self.context.runner.run(&self.context.python, &args).await?;

        // The directory exists already; the index proves the script finished
        Artifact::produced(output_dir.join(AUDIO_INFO_FILE), ArtifactKind::Transcript).await?;
        Artifact::produced(output_dir, ArtifactKind::SpeechDir).await
    }

    async fn synthesize_text(&self, text: &str, language: &Language, name: &str) -> Result<SpokenAudio> {
        if text.trim().is_empty() {
            return Err(AlimeError::InvalidRequest("text must not be empty".to_string()));
        }

        let output_path = self.context.output_dir.join(format!("{}.wav", name));
        info!("Synthesizing {} speech into {}", language.name, output_path.display());
        clear_stale(&output_path).await?;

        let args = vec![
            self.config.text_script.clone(),
            text.to_string(),
            "--name".to_string(),
            name.to_string(),
            "--language".to_string(),
            language.code.to_string(),
        ];
        let output = self.context.runner.run(&self.context.python, &args).await?;

        // The script prints the clip length as its last line
        let length = output
            .last_line()
            .and_then(|line| line.parse::<f64>().ok())
            .ok_or_else(|| {
                AlimeError::Media(format!("could not read audio length from: {}", output.combined))
            })?;
        debug!("Synthesized {:.2}s of audio", length);

        let artifact = Artifact::produced(output_path, ArtifactKind::Audio).await?;
        Ok(SpokenAudio { artifact, length })
    }
}
