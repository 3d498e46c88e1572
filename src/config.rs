use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, AlimeError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub uploads: UploadsConfig,
    pub scripts: ScriptsConfig,
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub speech: SpeechConfig,
    pub audio: AudioConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; "*" allows any origin
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes (uploads included)
    pub max_body_bytes: usize,
    /// Path prefixes that may be fetched through the download-by-path endpoint
    pub download_prefixes: Vec<String>,
    /// Path prefixes that may be streamed through the audio endpoint
    pub audio_prefixes: Vec<String>,
}

/// Working directories shared with the external scripts.
///
/// Every relative path is resolved against `root`, which is also the working
/// directory of every spawned tool. The scripts write some of their outputs
/// relative to their own working directory, so these defaults must stay in
/// lockstep with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub root: PathBuf,
    pub database: PathBuf,
    pub uploads: PathBuf,
    pub transcripts: PathBuf,
    pub srt: PathBuf,
    pub exported: PathBuf,
    pub segments_json: PathBuf,
    pub tts: PathBuf,
    pub translated: PathBuf,
    pub temporary: PathBuf,
    pub public: PathBuf,
    pub error_log: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    /// Accepted multipart content types
    pub allowed_content_types: Vec<String>,
    /// Uploads older than this are deleted on the next upload request
    pub max_age_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Interpreter used for every script stage
    pub python: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    pub implementation: TranscriberImplementation,
    pub faster_whisper_script: String,
    pub openai_whisper_script: String,
    /// Whisper model size (tiny, base, small, medium, large-v2)
    pub model: String,
    /// Source language hint; only honoured by the openai-whisper back-end
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriberImplementation {
    /// scripts/faster-whisper.py
    FasterWhisper,
    /// whisper_transcribe.py (openai-whisper)
    OpenaiWhisper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    pub script: String,
    /// Hugging Face model passed to the translation script
    pub model: String,
    pub batch_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Per-segment synthesis script (writes audio_info.json)
    pub segments_script: String,
    /// Free-text synthesis script (prints the audio length)
    pub text_script: String,
    /// Directory the free-text script writes into, relative to the root
    pub text_output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub separate_script: String,
    pub mix_script: String,
    /// Output directory of the separation model, relative to the root
    pub separated_dir: PathBuf,
    /// Scratch directory the separation script extracts audio into
    pub extract_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Additional encoding options for subtitle burn-in
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub subtitle_options: Vec<String>,
    /// Gain applied to the mixed soundtrack when it replaces the video audio
    pub volume_gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 2 * 1024 * 1024 * 1024,
            download_prefixes: vec!["output/".to_string()],
            audio_prefixes: vec!["output/tts/".to_string(), "separated/".to_string()],
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            database: PathBuf::from("data.db"),
            uploads: PathBuf::from("uploads"),
            transcripts: PathBuf::from("output/transcripts"),
            srt: PathBuf::from("output/srt"),
            exported: PathBuf::from("output/exported"),
            segments_json: PathBuf::from("output/json"),
            tts: PathBuf::from("output/tts"),
            translated: PathBuf::from("translated_output"),
            temporary: PathBuf::from("temporary-data"),
            public: PathBuf::from("public"),
            error_log: PathBuf::from("error/scripts_error_log.txt"),
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            allowed_content_types: vec![
                "video/mp4".to_string(),
                "video/mpeg".to_string(),
                "audio/mpeg".to_string(),
                "audio/wav".to_string(),
            ],
            max_age_hours: 8,
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            implementation: TranscriberImplementation::FasterWhisper,
            faster_whisper_script: "scripts/faster-whisper.py".to_string(),
            openai_whisper_script: "whisper_transcribe.py".to_string(),
            model: "medium".to_string(),
            language: None,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            script: "scripts/translate.py".to_string(),
            model: "facebook/nllb-200-distilled-600M".to_string(),
            batch_size: 8,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            segments_script: "scripts/text-to-speech-scripts/generate-tts-from-segments.py".to_string(),
            text_script: "scripts/text-to-speech-scripts/tts-input.py".to_string(),
            text_output_dir: PathBuf::from("output/tts/temporary-output"),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            separate_script: "scripts/text-to-speech-scripts/split-BGM.py".to_string(),
            mix_script: "scripts/text-to-speech-scripts/build-audio-with-bgm.py".to_string(),
            separated_dir: PathBuf::from("separated/htdemucs"),
            extract_dir: PathBuf::from("output"),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            subtitle_options: vec![
                // Example encoding options users can customize:
                // "-preset".to_string(), "medium".to_string(),
                // "-crf".to_string(), "23".to_string(),
            ],
            volume_gain: 9.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "alime.log".to_string(),
        }
    }
}

impl PathsConfig {
    /// Resolve a configured path against the working root.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Express an absolute artifact path relative to the working root,
    /// the form handed back to clients.
    pub fn relative(&self, path: &Path) -> String {
        pathdiff::diff_paths(path, &self.root)
            .unwrap_or_else(|| path.to_path_buf())
            .to_string_lossy()
            .replace('\\', "/")
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AlimeError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| AlimeError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AlimeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| AlimeError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply `HOST` and `PORT` from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(std::env::var("HOST").ok(), std::env::var("PORT").ok())
    }

    pub fn apply_overrides(&mut self, host: Option<String>, port: Option<String>) -> Result<()> {
        if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| AlimeError::Config(format!("Invalid PORT value: {}", port)))?;
        }
        Ok(())
    }
}
