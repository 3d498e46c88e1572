// Speech synthesis
//
// - EdgeTts: edge-tts scripts, one for transcript segments and one for free text
// - AudioIndex: the audio_info.json written next to synthesized segments

pub mod edge_tts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub use edge_tts::EdgeTtsSynthesizer;

use crate::artifact::Artifact;
use crate::error::{AlimeError, Result};
use crate::models::{Segment, SpeechSegment};
use crate::translate::Language;

/// Index file written by the segment synthesis script.
pub const AUDIO_INFO_FILE: &str = "audio_info.json";

/// Audio synthesized from free text.
#[derive(Debug, Clone)]
pub struct SpokenAudio {
    pub artifact: Artifact,
    /// Duration in seconds
    pub length: f64,
}

/// Main trait for speech synthesis operations
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Voice every segment of a transcript into `output_dir`
    async fn synthesize_segments(
        &self,
        transcript: &Artifact,
        language: &Language,
        output_dir: &Path,
    ) -> Result<Artifact>;

    /// Voice a single piece of text into a file called `name`
    async fn synthesize_text(&self, text: &str, language: &Language, name: &str) -> Result<SpokenAudio>;
}

/// One entry of `audio_info.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    pub id: i64,
    #[serde(rename = "audioLength")]
    pub audio_length: f64,
    #[serde(rename = "audioPath")]
    pub audio_path: String,
}

/// Synthesized clips keyed by segment id
#[derive(Debug, Default)]
pub struct AudioIndex {
    entries: HashMap<i64, AudioInfo>,
}

impl AudioIndex {
    pub fn from_entries(entries: Vec<AudioInfo>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Load the index of a speech directory artifact
    pub async fn load(speech_dir: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(speech_dir.join(AUDIO_INFO_FILE)).await?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        let entries: Vec<AudioInfo> = serde_json::from_str(content)?;
        Ok(Self::from_entries(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Join segments with their clips, keeping segment order.
    /// Every segment must have a clip.
    pub fn attach(&self, segments: &[Segment]) -> Result<Vec<SpeechSegment>> {
        segments
            .iter()
            .map(|segment| {
                let info = self.entries.get(&segment.id).ok_or_else(|| {
                    AlimeError::MissingArtifact(format!("synthesized audio for segment {}", segment.id))
                })?;

                Ok(SpeechSegment {
                    id: segment.id,
                    start: segment.start,
                    end: segment.end,
                    text: segment.text.clone(),
                    audio_length: info.audio_length,
                    audio_path: info.audio_path.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: i64, length: f64) -> AudioInfo {
        AudioInfo {
            id,
            audio_length: length,
            audio_path: format!("output/tts/clip/vi/clip_{}.wav", id),
        }
    }

    #[test]
    fn test_attach_keeps_segment_order() {
        // The script appends entries as concurrent tasks finish
        let index = AudioIndex::from_entries(vec![info(2, 0.8), info(1, 1.2)]);
        let segments = vec![Segment::new(1, 0.0, 1.0, "một"), Segment::new(2, 1.0, 2.0, "hai")];

        let joined = index.attach(&segments).unwrap();
        assert_eq!(joined[0].id, 1);
        assert_eq!(joined[0].audio_length, 1.2);
        assert_eq!(joined[1].audio_path, "output/tts/clip/vi/clip_2.wav");
    }

    #[test]
    fn test_attach_missing_clip() {
        let index = AudioIndex::from_entries(vec![info(1, 1.0)]);
        let segments = vec![Segment::new(1, 0.0, 1.0, "a"), Segment::new(5, 1.0, 2.0, "b")];

        assert!(matches!(index.attach(&segments), Err(AlimeError::MissingArtifact(_))));
    }

    #[tokio::test]
    async fn test_load_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(AUDIO_INFO_FILE),
            r#"[{"id": 0, "audioLength": 2.5, "audioPath": "output/tts/x/en/x_0.wav"}]"#,
        )
        .unwrap();

        let index = AudioIndex::load(dir.path()).await.unwrap();
        assert_eq!(index.len(), 1);
    }
}
