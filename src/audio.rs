//! Audio capture port and ephemeral audio handles
//!
//! Recorded clips are kept in memory and referenced from messages through
//! `blob:` handles. Handles do not survive a restart.

use async_trait::async_trait;
use log::{debug, error, info};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::AudioError;

/// Mime type every recording is tagged with
pub const AUDIO_MIME_TYPE: &str = "audio/webm";

const HANDLE_PREFIX: &str = "blob:";

#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl AudioClip {
    pub fn new(data: Vec<u8>) -> Self {
        AudioClip {
            mime_type: AUDIO_MIME_TYPE.to_string(),
            data,
        }
    }
}

/// A capture device: ask for access, record until stopped, hand back a clip
#[async_trait]
pub trait AudioRecorder: Send {
    async fn request_access(&mut self) -> Result<(), AudioError>;
    async fn start(&mut self) -> Result<(), AudioError>;
    async fn stop(&mut self) -> Result<AudioClip, AudioError>;
}

/// Records by reading a pre-recorded audio file. Access is denied when the
/// file cannot be read, the same way a missing microphone would refuse.
pub struct FileRecorder {
    path: PathBuf,
    granted: bool,
    recording: bool,
}

impl FileRecorder {
    pub fn new(path: PathBuf) -> Self {
        FileRecorder {
            path,
            granted: false,
            recording: false,
        }
    }
}

#[async_trait]
impl AudioRecorder for FileRecorder {
    async fn request_access(&mut self) -> Result<(), AudioError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => {
                self.granted = true;
                Ok(())
            }
            Ok(_) => Err(AudioError::AccessDenied(format!(
                "{} is not a file",
                self.path.display()
            ))),
            Err(e) => Err(AudioError::AccessDenied(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn start(&mut self) -> Result<(), AudioError> {
        if !self.granted {
            self.request_access().await?;
        }
        self.recording = true;
        debug!("Recording from {}", self.path.display());
        Ok(())
    }

    async fn stop(&mut self) -> Result<AudioClip, AudioError> {
        if !self.recording {
            return Err(AudioError::NotRecording);
        }
        self.recording = false;

        let data = tokio::fs::read(&self.path).await?;
        if data.is_empty() {
            return Err(AudioError::EmptyRecording);
        }
        Ok(AudioClip::new(data))
    }
}

/// Run one full capture with `recorder`. Denied access is logged and returned;
/// nothing is recorded in that case.
pub async fn record_clip<R: AudioRecorder + ?Sized>(recorder: &mut R) -> Result<AudioClip, AudioError> {
    if let Err(e) = recorder.request_access().await {
        error!("Error accessing microphone: {}", e);
        return Err(e);
    }
    recorder.start().await?;
    let clip = recorder.stop().await?;
    info!("Recorded {} bytes of {}", clip.data.len(), clip.mime_type);
    Ok(clip)
}

/// In-memory clip registry handing out `blob:` references. Clips stay
/// registered until the process exits.
#[derive(Clone, Default)]
pub struct AudioRegistry {
    clips: Arc<Mutex<HashMap<String, Arc<AudioClip>>>>,
}

impl AudioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, clip: AudioClip) -> String {
        let handle = format!("{}{}", HANDLE_PREFIX, Uuid::new_v4());
        self.lock().insert(handle.clone(), Arc::new(clip));
        debug!("Registered audio handle {}", handle);
        handle
    }

    pub fn resolve(&self, handle: &str) -> Option<Arc<AudioClip>> {
        self.lock().get(handle).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AudioClip>>> {
        self.clips.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
