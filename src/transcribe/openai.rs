// openai-whisper script back-end

use async_trait::async_trait;
use tracing::{debug, info};

use crate::artifact::{clear_stale, Artifact, ArtifactKind};
use crate::config::TranscriberConfig;
use crate::error::Result;
use crate::runner::ScriptContext;
use super::Transcriber;

pub struct OpenAITranscriber {
    config: TranscriberConfig,
    context: ScriptContext,
}

impl OpenAITranscriber {
    pub fn new(config: TranscriberConfig, context: ScriptContext) -> Self {
        Self { config, context }
    }

    fn build_args(&self, media: &str) -> Vec<String> {
        let mut args = vec![
            self.config.openai_whisper_script.clone(),
            media.to_string(),
            "--model".to_string(),
            self.config.model.clone(),
            "--output-formats".to_string(),
            "json".to_string(),
            "--output-dir".to_string(),
            self.context.output_dir.to_string_lossy().to_string(),
        ];

        // Add language if specified
        if let Some(language) = &self.config.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }

        args
    }
}

#[async_trait]
impl Transcriber for OpenAITranscriber {
    async fn transcribe(&self, media: &Artifact, process_id: &str) -> Result<Artifact> {
        let media_path = media.expect(ArtifactKind::Media)?;
        // This script names its output after the media file
        let output_path = self.context.output_dir.join(format!("{}.json", media.stem()));

        info!("Transcribing {} with openai-whisper ({})", media_path.display(), self.config.model);
        debug!("Process id {} -> {}", process_id, output_path.display());

        tokio::fs::create_dir_all(&self.context.output_dir).await?;
        clear_stale(&output_path).await?;

        let args = self.build_args(&media_path.to_string_lossy());
        self.context.runner.run(&self.context.python, &args).await?;

        Artifact::produced(output_path, ArtifactKind::Transcript).await
    }
}
