// Transcript translation
//
// - Languages: static table of accepted languages and their model codes
// - Nllb: Hugging Face NLLB script back-end

pub mod languages;
pub mod nllb;

use async_trait::async_trait;

pub use languages::{lookup, speech_language, supported, Language};
pub use nllb::NllbTranslator;

use crate::artifact::Artifact;
use crate::error::Result;

/// Main trait for translation operations
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a transcript file into `target`, producing a new transcript
    async fn translate(&self, transcript: &Artifact, target: &Language) -> Result<Artifact>;
}
