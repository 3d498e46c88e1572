use async_trait::async_trait;
use tracing::info;

use crate::artifact::{clear_stale, Artifact, ArtifactKind};
use crate::config::TranslateConfig;
use crate::error::Result;
use crate::runner::ScriptContext;
use super::{Language, Translator};

/// Hugging Face NLLB translation through scripts/translate.py.
///
/// The script writes `<output dir>/<input stem>_translated.json`.
pub struct NllbTranslator {
    config: TranslateConfig,
    context: ScriptContext,
}

impl NllbTranslator {
    pub fn new(config: TranslateConfig, context: ScriptContext) -> Self {
        Self { config, context }
    }

    fn build_args(&self, input: &str, target: &Language) -> Vec<String> {
        vec![
            self.config.script.clone(),
            input.to_string(),
            "--target-language".to_string(),
            target.nllb.to_string(),
            "--output-dir".to_string(),
            self.context.output_dir.to_string_lossy().to_string(),
            "--model".to_string(),
            self.config.model.clone(),
            "--batch-size".to_string(),
            self.config.batch_size.to_string(),
        ]
    }
}

#[async_trait]
impl Translator for NllbTranslator {
    async fn translate(&self, transcript: &Artifact, target: &Language) -> Result<Artifact> {
        let input_path = transcript.expect(ArtifactKind::Transcript)?;
        let output_path = self
            .context
            .output_dir
            .join(format!("{}_translated.json", transcript.stem()));

        info!("Translating {} to {} ({})", input_path.display(), target.name, target.nllb);

        tokio::fs::create_dir_all(&self.context.output_dir).await?;
        clear_stale(&output_path).await?;

        let args = self.build_args(&input_path.to_string_lossy(), target);
        self.context.runner.run(&self.context.python, &args).await?;

        Artifact::produced(output_path, ArtifactKind::Transcript).await
    }
}
