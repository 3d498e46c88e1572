// Transcription back-ends
//
// Both implementations shell out to a Python script and read back the JSON
// transcript it writes. They differ in argument shape and output naming:
// - FasterWhisper: scripts/faster-whisper.py, output named after the process id
// - OpenaiWhisper: whisper_transcribe.py, output named after the media stem
//
// To add a back-end, add a variant to TranscriberImplementation and a match
// arm in TranscriberFactory.

pub mod faster_whisper;
pub mod openai;

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::config::{TranscriberConfig, TranscriberImplementation};
use crate::error::Result;
use crate::models::Transcript;
use crate::runner::ScriptContext;

pub use faster_whisper::FasterWhisperTranscriber;
pub use openai::OpenAITranscriber;

/// Main trait for transcription operations
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe uploaded media into a transcript artifact
    async fn transcribe(&self, media: &Artifact, process_id: &str) -> Result<Artifact>;

    /// Transcribe and parse the resulting file
    async fn transcribe_segments(&self, media: &Artifact, process_id: &str) -> Result<Transcript> {
        let artifact = self.transcribe(media, process_id).await?;
        Transcript::load(artifact.path()).await
    }
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create a transcriber based on the configured implementation
    pub fn create_transcriber(config: TranscriberConfig, context: ScriptContext) -> Box<dyn Transcriber> {
        match config.implementation {
            TranscriberImplementation::FasterWhisper => {
                Box::new(FasterWhisperTranscriber::new(config, context))
            }
            TranscriberImplementation::OpenaiWhisper => {
                Box::new(OpenAITranscriber::new(config, context))
            }
        }
    }
}
