use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlimeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Process id not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{description} failed ({status}): {output}")]
    Process {
        description: String,
        status: String,
        output: String,
    },

    #[error("Expected output was not produced: {0}")]
    MissingArtifact(String),

    #[error("Artifact {path} is {actual}, expected {expected}")]
    ArtifactKind {
        path: String,
        actual: String,
        expected: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Path not allowed: {0}")]
    PathNotAllowed(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AlimeError {
    /// True for errors caused by the caller rather than by a tool or the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AlimeError::InvalidRequest(_)
                | AlimeError::UnsupportedMedia(_)
                | AlimeError::UnsupportedLanguage(_)
                | AlimeError::PathNotAllowed(_)
                | AlimeError::ProcessNotFound(_)
                | AlimeError::FileNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AlimeError>;
