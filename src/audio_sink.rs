use crate::tts::AudioClip;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone)]
pub enum AudioError {
    #[error("Failed to save audio: {0}")]
    FailedToSaveAudio(String),

    #[error("Audio device error: {0}")]
    DeviceError(String),
}

/// Core trait for audio output handling
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    /// Play a clip and return once playback has finished. Returning early is
    /// expected when `cancel` fires.
    async fn play(&self, clip: &AudioClip, cancel: CancellationToken) -> Result<(), AudioError>;

    /// Stop audio playback and clear any buffered data
    async fn stop(&self) -> Result<(), AudioError>;
}

/// Prints utterances to stdout, pacing them like speech
pub struct ConsoleSink {
    words_per_minute: u32,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            words_per_minute: 0,
        }
    }

    /// Hold each utterance for roughly its spoken length
    pub fn paced(words_per_minute: u32) -> Self {
        Self { words_per_minute }
    }

    fn speaking_time(&self, text: &str) -> Duration {
        if self.words_per_minute == 0 {
            return Duration::ZERO;
        }
        let words = text.split_whitespace().count() as u64;
        Duration::from_millis(words * 60_000 / self.words_per_minute as u64)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioSink for ConsoleSink {
    async fn play(&self, clip: &AudioClip, cancel: CancellationToken) -> Result<(), AudioError> {
        println!("🗣️  {}", clip.text);
        tokio::select! {
            _ = tokio::time::sleep(self.speaking_time(&clip.text)) => {}
            _ = cancel.cancelled() => {
                log::debug!("Console playback interrupted");
            }
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Writes each synthesized clip to a numbered file in a directory
pub struct FileSink {
    dir: PathBuf,
    counter: AtomicUsize,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| AudioError::DeviceError(e.to_string()))?;
        Ok(Self {
            dir,
            counter: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait::async_trait]
impl AudioSink for FileSink {
    async fn play(&self, clip: &AudioClip, cancel: CancellationToken) -> Result<(), AudioError> {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = self
            .dir
            .join(format!("utterance-{:04}.{}", index, clip.format));

        tokio::fs::write(&path, &clip.data)
            .await
            .map_err(|e| AudioError::FailedToSaveAudio(format!("{}: {}", path.display(), e)))?;

        log::info!("💾 Saved utterance to {}", path.display());
        Ok(())
    }

    async fn stop(&self) -> Result<(), AudioError> {
        Ok(())
    }
}
