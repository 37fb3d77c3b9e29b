use thiserror::Error;

/// Errors surfaced by the chat orchestrator
#[derive(Debug, Error)]
pub enum ChatError {
    /// A send cycle is still waiting for its reply
    #[error("A message is already being sent")]
    SendInProgress,

    /// Capturing or registering audio failed
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
}

/// Errors from the persistence port
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored state: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the audio capture port
#[derive(Debug, Error)]
pub enum AudioError {
    /// The capture device refused access
    #[error("Microphone access denied: {0}")]
    AccessDenied(String),

    #[error("Recording has not been started")]
    NotRecording,

    #[error("Recording produced no audio")]
    EmptyRecording,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while reading configuration files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
