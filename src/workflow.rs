use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::artifact::{Artifact, ArtifactKind};
use crate::audio::AudioMixer;
use crate::config::{Config, PathsConfig};
use crate::error::{AlimeError, Result};
use crate::media::{FfmpegProcessor, MediaProcessor};
use crate::models::{
    rebase_segments, ExportRecord, ExportResponse, ExportVideoRequest, MediaStorageData, Segment,
    SpeechSegment, SpokenText, Transcript,
};
use crate::runner::{ProcessRunner, ScriptContext};
use crate::speech::{AudioIndex, EdgeTtsSynthesizer, SpeechSynthesizer};
use crate::store::Store;
use crate::subtitle::generate_srt;
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::translate::{speech_language, Language, NllbTranslator, Translator};
use crate::uploads;

/// One step of an export, in pipeline order.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportStage {
    Trim { start: f64, end: f64 },
    Caption,
    AppendSpeech { language: &'static Language },
}

impl ExportStage {
    pub fn name(&self) -> &'static str {
        match self {
            ExportStage::Trim { .. } => "trim",
            ExportStage::Caption => "caption",
            ExportStage::AppendSpeech { .. } => "speech",
        }
    }
}

/// Validated stage selection of an export request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPlan {
    stages: Vec<ExportStage>,
}

impl ExportPlan {
    /// Build the plan in fixed order: trim, caption, append speech.
    pub fn from_request(request: &ExportVideoRequest) -> Result<Self> {
        let mut stages = Vec::new();

        if request.is_trim_video {
            let (start, end) = (request.trim_start, request.trim_end);
            if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
                return Err(AlimeError::InvalidRequest(format!(
                    "trim window must satisfy 0 <= trimStart < trimEnd, got {} and {}",
                    start, end
                )));
            }
            stages.push(ExportStage::Trim { start, end });
        }

        if (request.is_show_caption || request.is_append_tts) && request.segments.is_empty() {
            return Err(AlimeError::InvalidRequest(
                "segments are required for captions and speech".to_string(),
            ));
        }

        if request.is_show_caption {
            stages.push(ExportStage::Caption);
        }

        if request.is_append_tts {
            let language = speech_language(&request.language)?;
            stages.push(ExportStage::AppendSpeech { language });
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[ExportStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// State threaded through the stages of one export run.
struct PipelineContext {
    current: Artifact,
    segments: Vec<Segment>,
    /// `<sanitized file name>_<run id>`
    base_name: String,
    suffixes: Vec<&'static str>,
    extension: String,
    exported_dir: PathBuf,
    completed: Vec<String>,
}

impl PipelineContext {
    fn new(data: &MediaStorageData, source: Artifact, segments: Vec<Segment>, exported_dir: PathBuf) -> Self {
        let extension = match source.extension() {
            ext if ext.is_empty() => ".mp4".to_string(),
            ext => ext,
        };

        Self {
            current: source,
            segments,
            base_name: format!("{}_{}", sanitize_name(&data.file_name), run_id()),
            suffixes: Vec::new(),
            extension,
            exported_dir,
            completed: Vec::new(),
        }
    }

    /// Name of the file the next stage writes, with `suffix` appended.
    fn next_output(&mut self, suffix: &'static str, extension: &str) -> PathBuf {
        self.suffixes.push(suffix);
        self.exported_dir.join(format!(
            "{}_{}{}",
            self.base_name,
            self.suffixes.join("_"),
            extension
        ))
    }

    fn advance(&mut self, artifact: Artifact, stage: &ExportStage) {
        info!("Stage {} produced {}", stage.name(), artifact.path().display());
        self.current = artifact;
        self.completed.push(stage.name().to_string());
    }
}

/// A file announced by the upload handler before its bytes are written.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub process_id: String,
    pub data: MediaStorageData,
    /// Absolute destination of the upload
    pub path: PathBuf,
}

pub struct Workflow {
    config: Config,
    store: Arc<Store>,
    transcriber: Box<dyn Transcriber>,
    translator: Box<dyn Translator>,
    speech: Box<dyn SpeechSynthesizer>,
    audio: AudioMixer,
    media: Box<dyn MediaProcessor>,
}

impl Workflow {
    pub fn new(config: Config, store: Arc<Store>, runner: Arc<dyn ProcessRunner>) -> Self {
        let paths = &config.paths;
        let script = |output_dir: PathBuf| ScriptContext {
            python: config.scripts.python.clone(),
            output_dir,
            runner: runner.clone(),
        };

        let transcriber = TranscriberFactory::create_transcriber(
            config.transcriber.clone(),
            script(paths.resolve(&paths.transcripts)),
        );
        let translator = Box::new(NllbTranslator::new(
            config.translate.clone(),
            script(paths.resolve(&paths.translated)),
        ));
        let speech = Box::new(EdgeTtsSynthesizer::new(
            config.speech.clone(),
            script(paths.resolve(&config.speech.text_output_dir)),
        ));
        let audio = AudioMixer::new(
            config.audio.clone(),
            script(paths.resolve(&config.audio.separated_dir)),
            paths.resolve(&config.audio.extract_dir),
        );
        let media = Box::new(FfmpegProcessor::new(config.media.clone(), runner.clone()));

        Self {
            config,
            store,
            transcriber,
            translator,
            speech,
            audio,
            media,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &PathsConfig {
        &self.config.paths
    }

    /// Check that ffmpeg can be launched and report its version
    pub async fn check_dependencies(&self) -> Result<String> {
        self.media.check_availability().await?;
        self.media.version_info().await
    }

    /// Delete uploads older than the configured age
    pub async fn cleanup_uploads(&self) -> Result<usize> {
        let max_age = Duration::from_secs(self.config.uploads.max_age_hours * 3600);
        let upload_dir = self.paths().resolve(&self.paths().uploads);
        Ok(tokio::task::spawn_blocking(move || uploads::clean_expired(&upload_dir, max_age)).await?)
    }

    /// Validate an incoming upload and pick its process id and destination.
    pub async fn prepare_upload(&self, original_name: &str, content_type: &str) -> Result<PendingUpload> {
        let removed = self.cleanup_uploads().await?;
        if removed > 0 {
            info!("Removed {} expired uploads", removed);
        }

        if !uploads::is_allowed_content_type(content_type, &self.config.uploads.allowed_content_types) {
            return Err(AlimeError::UnsupportedMedia(content_type.to_string()));
        }

        let upload_dir = self.paths().resolve(&self.paths().uploads);
        fs::create_dir_all(&upload_dir).await?;

        let process_id = Uuid::new_v4().to_string();
        let data = MediaStorageData::new(
            &process_id,
            original_name,
            &self.paths().uploads.to_string_lossy().replace('\\', "/"),
        );
        let path = self.paths().resolve(&data.file_path);

        Ok(PendingUpload {
            process_id,
            data,
            path,
        })
    }

    /// Record a fully written upload under its process id.
    pub async fn register_upload(&self, upload: &PendingUpload) -> Result<()> {
        self.store.put(&upload.process_id, &upload.data).await?;
        info!("Stored upload {} as {}", upload.data.file_full_name, upload.process_id);
        Ok(())
    }

    /// Metadata of an upload, or `ProcessNotFound`.
    pub async fn media(&self, process_id: &str) -> Result<MediaStorageData> {
        self.store
            .find(process_id)
            .await?
            .ok_or_else(|| AlimeError::ProcessNotFound(process_id.to_string()))
    }

    async fn media_artifact(&self, data: &MediaStorageData) -> Result<Artifact> {
        let path = self.paths().resolve(&data.file_path);
        Artifact::produced(path, media_kind(&data.file_ext))
            .await
            .map_err(|_| AlimeError::FileNotFound(data.file_path.clone()))
    }

    /// Transcribe the upload of `process_id`.
    pub async fn transcribe(&self, process_id: &str) -> Result<Vec<Segment>> {
        let data = self.media(process_id).await?;
        let media = self.media_artifact(&data).await?;

        let transcript = self.transcriber.transcribe_segments(&media, process_id).await?;
        info!("Transcribed {} segments for {}", transcript.segments.len(), process_id);
        Ok(transcript.segments)
    }

    /// Translate the transcript of `process_id` and voice the result.
    pub async fn translate(&self, process_id: &str, target_language: &str) -> Result<Vec<SpeechSegment>> {
        let language = speech_language(target_language)?;
        self.media(process_id).await?;

        let transcript_path = self
            .paths()
            .resolve(&self.paths().transcripts)
            .join(format!("{}.json", process_id));
        let transcript = Artifact::produced(&transcript_path, ArtifactKind::Transcript)
            .await
            .map_err(|_| AlimeError::FileNotFound(format!("transcript of {}", process_id)))?;

        // Re-serialize so the translation script sees lowercase `id` keys
        // whichever back-end wrote the transcript. Each language gets its
        // own input so outputs do not collide.
        let segments = Transcript::load(transcript.path()).await?.segments;
        let temporary_dir = self.paths().resolve(&self.paths().temporary);
        fs::create_dir_all(&temporary_dir).await?;
        let input_path = temporary_dir.join(format!("{}_{}.json", process_id, language.code));
        let content = serde_json::to_string_pretty(&Transcript::from_segments(segments))?;
        fs::write(&input_path, content).await?;
        let input = Artifact::produced(input_path, ArtifactKind::Transcript).await?;

        let translated = self.translator.translate(&input, language).await?;

        let speech_dir = self
            .paths()
            .resolve(&self.paths().tts)
            .join(translated.stem())
            .join(language.code);
        let speech = self
            .speech
            .synthesize_segments(&translated, language, &speech_dir)
            .await?;

        let segments = Transcript::load(translated.path()).await?.segments;
        let index = AudioIndex::load(speech.path()).await?;

        let mut joined = index.attach(&segments)?;
        for segment in &mut joined {
            segment.audio_path = self.paths().relative(Path::new(&segment.audio_path));
        }
        Ok(joined)
    }

    /// Voice free text into a fresh file.
    pub async fn synthesize_text(&self, text: &str, language: &str) -> Result<SpokenText> {
        let language = speech_language(language)?;
        let name = format!("{}_{}", chrono::Local::now().format("%Y%m%d%H%M%S"), run_id());

        let spoken = self.speech.synthesize_text(text, language, &name).await?;
        Ok(SpokenText {
            output_file: self.paths().relative(spoken.artifact.path()),
            length: spoken.length,
        })
    }

    /// Run the flag-gated export pipeline for one upload.
    pub async fn export(&self, request: &ExportVideoRequest) -> Result<ExportResponse> {
        let plan = ExportPlan::from_request(request)?;
        let data = self.media(&request.process_id).await?;
        let source = self.media_artifact(&data).await?;

        if !plan.is_empty() && source.kind() == ArtifactKind::Audio {
            return Err(AlimeError::InvalidRequest(format!(
                "{} is not a video",
                data.file_full_name
            )));
        }

        let exported_dir = self.paths().resolve(&self.paths().exported);
        fs::create_dir_all(&exported_dir).await?;

        let mut context = PipelineContext::new(&data, source, request.segments.clone(), exported_dir);
        info!(
            "Exporting {} with stages {:?}",
            request.process_id,
            plan.stages().iter().map(ExportStage::name).collect::<Vec<_>>()
        );

        for stage in plan.stages() {
            let artifact = match stage {
                ExportStage::Trim { start, end } => self.trim_stage(&mut context, *start, *end).await?,
                ExportStage::Caption => self.caption_stage(&mut context).await?,
                ExportStage::AppendSpeech { language } => self.speech_stage(&mut context, language).await?,
            };
            context.advance(artifact, stage);
        }

        let file_path = self.paths().relative(context.current.path());
        let record = ExportRecord {
            file_path: file_path.clone(),
            stages: context.completed.clone(),
            created_at: chrono::Utc::now(),
        };
        self.store.put(&ExportRecord::key(&request.process_id), &record).await?;

        Ok(ExportResponse {
            file_path,
            stages: context.completed,
        })
    }

    /// Last export of `process_id`.
    pub async fn last_export(&self, process_id: &str) -> Result<ExportRecord> {
        self.media(process_id).await?;
        self.store
            .find(&ExportRecord::key(process_id))
            .await?
            .ok_or_else(|| AlimeError::FileNotFound(format!("no export for {}", process_id)))
    }

    async fn trim_stage(&self, context: &mut PipelineContext, start: f64, end: f64) -> Result<Artifact> {
        let extension = context.extension.clone();
        let output = context.next_output("trimmed", &extension);
        let artifact = self.media.trim_video(&context.current, &output, start, end).await?;

        context.segments = rebase_segments(&context.segments, start, end);
        if context.segments.is_empty() {
            warn!("No segments fall inside the trim window {:.2}..{:.2}", start, end);
        }
        Ok(artifact)
    }

    async fn caption_stage(&self, context: &mut PipelineContext) -> Result<Artifact> {
        let extension = context.extension.clone();
        let output = context.next_output("subtitled", &extension);
        let srt_path = self
            .paths()
            .resolve(&self.paths().srt)
            .join(format!("{}.srt", file_stem(&output)));

        let subtitles = generate_srt(&context.segments, &srt_path).await?;
        self.media.burn_subtitles(&context.current, &subtitles, &output).await
    }

    async fn speech_stage(&self, context: &mut PipelineContext, language: &Language) -> Result<Artifact> {
        let output = context.next_output("final", ".mp4");
        let name = file_stem(&output);

        let segments: Vec<Segment> = context
            .segments
            .iter()
            .cloned()
            .map(|s| s.with_language(language.code))
            .collect();
        let script = self.write_segments_json(&name, segments).await?;

        let background = self.audio.separate_background(&context.current).await?;

        let speech_dir = self.paths().resolve(&self.paths().tts).join(&name).join(language.code);
        let speech = self.speech.synthesize_segments(&script, language, &speech_dir).await?;

        let mixed = self.audio.mix(&speech, &script, &background).await?;
        self.media.replace_audio(&context.current, &mixed, &output).await
    }

    /// Write segments as a BOM-prefixed transcript for the speech scripts.
    async fn write_segments_json(&self, name: &str, segments: Vec<Segment>) -> Result<Artifact> {
        let dir = self.paths().resolve(&self.paths().segments_json);
        fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}.json", name));
        let content = serde_json::to_string_pretty(&Transcript::from_segments(segments))?;
        fs::write(&path, format!("\u{feff}{}", content)).await?;

        Artifact::produced(path, ArtifactKind::Transcript).await
    }
}

/// Short unique id of one pipeline run
fn run_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Keep ASCII letters, digits, '-' and '_' so names are safe in ffmpeg filters.
fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        "export".to_string()
    } else {
        sanitized
    }
}

fn media_kind(extension: &str) -> ArtifactKind {
    match extension.to_ascii_lowercase().as_str() {
        ".mp3" | ".wav" | ".m4a" | ".aac" | ".flac" | ".ogg" => ArtifactKind::Audio,
        _ => ArtifactKind::Media,
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
