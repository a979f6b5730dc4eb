//! Serialized speech output.
//!
//! All spoken responses go through one worker task that owns the pending
//! queue, so at most one clip is ever playing. A `High` priority item
//! interrupts a `Normal` one that is currently playing and jumps ahead of
//! every waiting `Normal` item; same-priority items keep arrival order.

use crate::audio_sink::{AudioError, AudioSink};
use crate::tts::{SpeechSynthesizer, TTSError, Voice};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum AudioQueueError {
    #[error("Speech synthesis failed: {0}")]
    Synthesis(#[from] TTSError),
    #[error("Playback failed: {0}")]
    Playback(#[from] AudioError),
    #[error("Audio queue is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// How an item left the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    /// Cut off by a high priority item, `stop_all` or shutdown
    Interrupted,
    /// Synthesis or playback failed; the queue moved on
    Failed,
    /// Removed by `stop_all` before it started
    Discarded,
}

type StartCallback = Box<dyn FnOnce() + Send>;
type EndCallback = Box<dyn FnOnce(PlaybackOutcome) + Send>;

#[derive(Default)]
pub struct SpeakCallbacks {
    pub on_start: Option<StartCallback>,
    pub on_end: Option<EndCallback>,
}

impl SpeakCallbacks {
    pub fn on_end(callback: impl FnOnce(PlaybackOutcome) + Send + 'static) -> Self {
        Self {
            on_start: None,
            on_end: Some(Box::new(callback)),
        }
    }
}

impl fmt::Debug for SpeakCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeakCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

struct AudioQueueItem {
    id: u64,
    text: String,
    voice: Voice,
    priority: Priority,
    callbacks: SpeakCallbacks,
    completion: oneshot::Sender<PlaybackOutcome>,
}

impl AudioQueueItem {
    fn start(&mut self) {
        log::debug!("🔊 Playing item {} ({:?}): '{}'", self.id, self.priority, self.text);
        if let Some(on_start) = self.callbacks.on_start.take() {
            on_start();
        }
    }

    /// Consumes the item, so `on_end` can only ever run once
    fn finish(mut self, outcome: PlaybackOutcome, outstanding: &AtomicUsize) {
        outstanding.fetch_sub(1, Ordering::SeqCst);
        if let Some(on_end) = self.callbacks.on_end.take() {
            on_end(outcome);
        }
        // The caller may have stopped waiting
        let _ = self.completion.send(outcome);
    }
}

enum QueueCommand {
    Enqueue(AudioQueueItem),
    StopAll,
    Shutdown,
}

pub struct AudioQueue {
    sender: mpsc::UnboundedSender<QueueCommand>,
    outstanding: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

impl AudioQueue {
    /// Spawn the playback worker on the current tokio runtime
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, sink: Arc<dyn AudioSink>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let outstanding = Arc::new(AtomicUsize::new(0));

        tokio::spawn(queue_loop(receiver, synthesizer, sink, outstanding.clone()));

        Self {
            sender,
            outstanding,
            next_id: AtomicU64::new(0),
        }
    }

    /// Queue an utterance and wait until it has left the queue.
    ///
    /// Synthesis and playback failures are not errors here: the item
    /// resolves as [`PlaybackOutcome::Failed`] and the queue keeps going.
    pub async fn speak(
        &self,
        text: impl Into<String>,
        voice: Voice,
        priority: Priority,
        callbacks: SpeakCallbacks,
    ) -> Result<PlaybackOutcome, AudioQueueError> {
        let (completion, done) = oneshot::channel();
        let item = AudioQueueItem {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            text: text.into(),
            voice,
            priority,
            callbacks,
            completion,
        };

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(command)) = self.sender.send(QueueCommand::Enqueue(item))
        {
            if let QueueCommand::Enqueue(item) = command {
                item.finish(PlaybackOutcome::Discarded, &self.outstanding);
            }
            return Err(AudioQueueError::Closed);
        }

        done.await.map_err(|_| AudioQueueError::Closed)
    }

    /// True while anything is playing or waiting to play
    pub fn is_speaking(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) > 0
    }

    /// Interrupt the current item and discard everything waiting
    pub fn stop_all(&self) {
        if self.sender.send(QueueCommand::StopAll).is_err() {
            log::warn!("Audio queue already closed");
        }
    }
}

impl Drop for AudioQueue {
    fn drop(&mut self) {
        let _ = self.sender.send(QueueCommand::Shutdown);
    }
}

fn enqueue(pending: &mut VecDeque<AudioQueueItem>, item: AudioQueueItem) {
    match item.priority {
        Priority::Normal => pending.push_back(item),
        Priority::High => {
            let position = pending
                .iter()
                .position(|queued| queued.priority == Priority::Normal)
                .unwrap_or(pending.len());
            pending.insert(position, item);
        }
    }
}

fn discard_all(pending: &mut VecDeque<AudioQueueItem>, outstanding: &AtomicUsize) {
    for item in pending.drain(..) {
        item.finish(PlaybackOutcome::Discarded, outstanding);
    }
}

async fn stop_sink(sink: &dyn AudioSink) {
    if let Err(e) = sink.stop().await {
        log::warn!("Failed to stop audio sink: {}", e);
    }
}

async fn play_item(
    synthesizer: &dyn SpeechSynthesizer,
    sink: &dyn AudioSink,
    text: &str,
    voice: Voice,
    cancel: CancellationToken,
) -> Result<(), AudioQueueError> {
    let clip = synthesizer.synthesize(text, voice).await?;
    if cancel.is_cancelled() {
        return Ok(());
    }
    sink.play(&clip, cancel).await?;
    Ok(())
}

async fn queue_loop(
    mut receiver: mpsc::UnboundedReceiver<QueueCommand>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    outstanding: Arc<AtomicUsize>,
) {
    let mut pending: VecDeque<AudioQueueItem> = VecDeque::new();
    let mut shutdown = false;

    while !shutdown {
        let mut item = match pending.pop_front() {
            Some(item) => item,
            None => match receiver.recv().await {
                Some(QueueCommand::Enqueue(item)) => item,
                Some(QueueCommand::StopAll) => continue,
                Some(QueueCommand::Shutdown) | None => break,
            },
        };

        item.start();
        let cancel = CancellationToken::new();

        let outcome = {
            let playback = play_item(
                synthesizer.as_ref(),
                sink.as_ref(),
                &item.text,
                item.voice,
                cancel.clone(),
            );
            tokio::pin!(playback);

            loop {
                tokio::select! {
                    result = &mut playback => {
                        break match result {
                            Ok(()) if cancel.is_cancelled() => PlaybackOutcome::Interrupted,
                            Ok(()) => PlaybackOutcome::Completed,
                            Err(e) => {
                                log::warn!("⚠️ Skipping utterance {}: {}", item.id, e);
                                PlaybackOutcome::Failed
                            }
                        };
                    }
                    command = receiver.recv() => match command {
                        Some(QueueCommand::Enqueue(next)) => {
                            let preempt = next.priority == Priority::High
                                && item.priority == Priority::Normal;
                            enqueue(&mut pending, next);
                            if preempt {
                                log::info!("⏭️ High priority speech interrupting item {}", item.id);
                                cancel.cancel();
                                stop_sink(sink.as_ref()).await;
                                break PlaybackOutcome::Interrupted;
                            }
                        }
                        Some(QueueCommand::StopAll) => {
                            log::info!("🛑 Stopping all speech");
                            cancel.cancel();
                            stop_sink(sink.as_ref()).await;
                            discard_all(&mut pending, &outstanding);
                            break PlaybackOutcome::Interrupted;
                        }
                        Some(QueueCommand::Shutdown) | None => {
                            cancel.cancel();
                            stop_sink(sink.as_ref()).await;
                            shutdown = true;
                            break PlaybackOutcome::Interrupted;
                        }
                    }
                }
            }
        };

        item.finish(outcome, &outstanding);
    }

    discard_all(&mut pending, &outstanding);
    log::debug!("Audio queue worker stopped");
}
