use async_trait::async_trait;
use tracing::info;

use crate::artifact::{clear_stale, Artifact, ArtifactKind};
use crate::config::TranscriberConfig;
use crate::error::Result;
use crate::runner::ScriptContext;
use super::Transcriber;

/// faster-whisper script back-end.
///
/// The script names its output after `--output-name` (extension stripped),
/// so passing the process id gives `<output dir>/<process id>.json`.
pub struct FasterWhisperTranscriber {
    config: TranscriberConfig,
    context: ScriptContext,
}

impl FasterWhisperTranscriber {
    pub fn new(config: TranscriberConfig, context: ScriptContext) -> Self {
        Self { config, context }
    }

    fn build_args(&self, media: &str, process_id: &str) -> Vec<String> {
        vec![
            self.config.faster_whisper_script.clone(),
            media.to_string(),
            "--model".to_string(),
            self.config.model.clone(),
            "--output-path".to_string(),
            self.context.output_dir.to_string_lossy().to_string(),
            "--output-name".to_string(),
            process_id.to_string(),
        ]
    }
}

#[async_trait]
impl Transcriber for FasterWhisperTranscriber {
    async fn transcribe(&self, media: &Artifact, process_id: &str) -> Result<Artifact> {
        let media_path = media.expect(ArtifactKind::Media)?;
        let output_path = self.context.output_dir.join(format!("{}.json", process_id));

        info!("Transcribing {} with faster-whisper ({})", media_path.display(), self.config.model);

        tokio::fs::create_dir_all(&self.context.output_dir).await?;
        clear_stale(&output_path).await?;

        let args = self.build_args(&media_path.to_string_lossy(), process_id);
        self.context.runner.run(&self.context.python, &args).await?;

        let artifact = Artifact::produced(output_path, ArtifactKind::Transcript).await?;
        info!("Transcription written to {}", artifact.path().display());
        Ok(artifact)
    }
}
