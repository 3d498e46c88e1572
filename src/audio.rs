//! Background music separation and voice-over mixing.

use std::path::PathBuf;
use tracing::info;

use crate::artifact::{clear_stale, Artifact, ArtifactKind};
use crate::config::AudioConfig;
use crate::error::Result;
use crate::runner::ScriptContext;

/// File the mix script writes next to the background track.
pub const MIXED_AUDIO_FILE: &str = "final_mixed_audio.wav";

pub struct AudioMixer {
    config: AudioConfig,
    /// `output_dir` is the separation model's output directory
    context: ScriptContext,
    extract_dir: PathBuf,
}

impl AudioMixer {
    pub fn new(config: AudioConfig, context: ScriptContext, extract_dir: PathBuf) -> Self {
        Self {
            config,
            context,
            extract_dir,
        }
    }

    /// Split the soundtrack of `media` and return its instrumental stem.
    ///
    /// The script extracts `<extract dir>/<stem>-audio.wav` and the model
    /// writes `<separated dir>/<stem>-audio/no_vocals.wav`.
    pub async fn separate_background(&self, media: &Artifact) -> Result<Artifact> {
        let media_path = media.expect(ArtifactKind::Media)?;
        let track = format!("{}-audio", media.stem());
        let output_path = self.context.output_dir.join(&track).join("no_vocals.wav");

        info!("Separating background music from {}", media_path.display());

        tokio::fs::create_dir_all(&self.extract_dir).await?;
        // The extraction step does not overwrite
        clear_stale(&self.extract_dir.join(format!("{}.wav", track))).await?;
        clear_stale(&output_path).await?;

        let args = vec![
            self.config.separate_script.clone(),
            media_path.to_string_lossy().to_string(),
        ];
        self.context.runner.run(&self.context.python, &args).await?;

        Artifact::produced(output_path, ArtifactKind::Audio).await
    }

    /// Lay the synthesized clips over the background track at their segment starts.
    pub async fn mix(&self, speech: &Artifact, segments: &Artifact, background: &Artifact) -> Result<Artifact> {
        let speech_dir = speech.expect(ArtifactKind::SpeechDir)?;
        let segments_path = segments.expect(ArtifactKind::Transcript)?;
        let background_path = background.expect(ArtifactKind::Audio)?;

        let output_path = background_path
            .parent()
            .map(|dir| dir.join(MIXED_AUDIO_FILE))
            .unwrap_or_else(|| PathBuf::from(MIXED_AUDIO_FILE));

        info!("Mixing {} over {}", speech_dir.display(), background_path.display());
        clear_stale(&output_path).await?;

        let args = vec![
            self.config.mix_script.clone(),
            speech_dir.to_string_lossy().to_string(),
            segments_path.to_string_lossy().to_string(),
            background_path.to_string_lossy().to_string(),
        ];
        self.context.runner.run(&self.context.python, &args).await?;

        Artifact::produced(output_path, ArtifactKind::Audio).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{MockProcessRunner, ProcessOutput};
    use std::path::Path;
    use std::sync::Arc;

    fn mixer(root: &Path, runner: MockProcessRunner) -> AudioMixer {
        AudioMixer::new(
            AudioConfig::default(),
            ScriptContext {
                python: "python".to_string(),
                output_dir: root.join("separated/htdemucs"),
                runner: Arc::new(runner),
            },
            root.join("output"),
        )
    }

    async fn file(path: PathBuf, kind: ArtifactKind) -> Artifact {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();
        Artifact::produced(path, kind).await.unwrap()
    }

    #[tokio::test]
    async fn test_separation_output_location() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let video = file(root.join("output/exported/clip_ab12_trimmed.mp4"), ArtifactKind::Video).await;
        // Left over from an interrupted run
        let leftover = file(root.join("output/clip_ab12_trimmed-audio.wav"), ArtifactKind::Audio).await;

        let mut runner = MockProcessRunner::new();
        let stem_dir = root.join("separated/htdemucs/clip_ab12_trimmed-audio");
        runner
            .expect_run()
            .withf(|_, args| args[0] == "scripts/text-to-speech-scripts/split-BGM.py" && args.len() == 2)
            .times(1)
            .returning(move |_, _| {
                std::fs::create_dir_all(&stem_dir).unwrap();
                std::fs::write(stem_dir.join("no_vocals.wav"), b"bgm").unwrap();
                Ok(ProcessOutput::default())
            });

        let bgm = mixer(&root, runner).separate_background(&video).await.unwrap();
        assert!(bgm.path().ends_with("clip_ab12_trimmed-audio/no_vocals.wav"));
        assert!(!leftover.path().exists());
    }

    #[tokio::test]
    async fn test_mix_writes_next_to_background() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let bgm = file(root.join("separated/htdemucs/clip-audio/no_vocals.wav"), ArtifactKind::Audio).await;
        let segments = file(root.join("output/json/clip.json"), ArtifactKind::Transcript).await;
        std::fs::create_dir_all(root.join("output/tts/clip/en")).unwrap();
        let speech = Artifact::produced(root.join("output/tts/clip/en"), ArtifactKind::SpeechDir)
            .await
            .unwrap();

        let mut runner = MockProcessRunner::new();
        let mixed = root.join("separated/htdemucs/clip-audio").join(MIXED_AUDIO_FILE);
        let write_to = mixed.clone();
        runner.expect_run().times(1).returning(move |_, _| {
            std::fs::write(&write_to, b"mix").unwrap();
            Ok(ProcessOutput::default())
        });

        let artifact = mixer(&root, runner).mix(&speech, &segments, &bgm).await.unwrap();
        assert_eq!(artifact.path(), mixed.as_path());
    }

    #[tokio::test]
    async fn test_mix_validates_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let bgm = file(root.join("bgm.wav"), ArtifactKind::Audio).await;

        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();

        // An audio file where the speech directory belongs
        let err = mixer(&root, runner).mix(&bgm, &bgm, &bgm).await.unwrap_err();
        assert!(matches!(err, crate::error::AlimeError::ArtifactKind { .. }));
    }
}
