//! Caller-side session controller.
//!
//! [`VoiceSession`] is the single object a UI owns: it validates the
//! configuration, builds the worker through an injected [`WorkerFactory`],
//! wires an audio source to it, and demultiplexes worker events into the
//! caller's two callbacks.  It holds no locks — callers drive it from one
//! place (an update loop or event handler) and poll with
//! [`VoiceSession::poll_events`].
//!
//! # Event flow
//!
//! ```text
//! poll_events()
//!   ├─ Keyword { label }        → phase = Intent,   on_keyword(label)
//!   ├─ Inference { inference }  → phase = WakeWord, on_inference(&inference)
//!   ├─ Info { info }            → context_info = Some(info)
//!   ├─ Ready                    → ignored (consumed by the factory handshake)
//!   └─ InitError { error }      → error = true, loaded = false
//! ```

use crate::audio::{AudioSource, AudioSourceFactory};
use crate::config::{ConfigError, SessionConfig};
use crate::voice::Inference;
use crate::worker::{WorkerFactory, WorkerHandle, WorkerRequest, WorkerResponse};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Which engine stage is expected to produce the next event.
///
/// Purely informational: it mirrors the engine's own internal hand-off and
/// flips on every keyword/inference event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Listening for the wake word.
    WakeWord,
    /// Wake word fired; an intent-inference pass is running.
    Intent,
}

impl Default for Phase {
    fn default() -> Self {
        Self::WakeWord
    }
}

// ---------------------------------------------------------------------------
// VoiceSession
// ---------------------------------------------------------------------------

/// Callback invoked with the keyword label on every wake-word detection.
pub type KeywordCallback = Box<dyn FnMut(&str) + Send>;
/// Callback invoked with the result of every intent-inference pass.
pub type InferenceCallback = Box<dyn FnMut(&Inference) + Send>;

/// One open wake-word + intent session: worker, audio source, and the
/// caller-visible status flags.
///
/// Configuration problems surface as an `Err` from [`VoiceSession::open`];
/// anything that fails *after* validation (engine init, audio setup) still
/// returns a session, with [`is_error`](Self::is_error) set and the partial
/// setup torn down — mirroring how the status would be rendered by a UI
/// either way.  Dropping the session releases the audio source first, then
/// the worker.
pub struct VoiceSession {
    // Field order doubles as the drop order: source before worker.
    source: Option<Box<dyn AudioSource>>,
    worker: Option<WorkerHandle>,
    on_keyword: KeywordCallback,
    on_inference: InferenceCallback,
    context_info: Option<String>,
    loaded: bool,
    listening: bool,
    error: bool,
    error_message: Option<String>,
    phase: Phase,
}

impl VoiceSession {
    /// Validate `config`, start a worker, and attach an audio source.
    ///
    /// The worker itself always starts unpaused — whether audio flows at
    /// open is governed entirely by the source honouring `config.start`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] before constructing anything when the
    /// configuration is unusable.  Asynchronous setup failures do not error:
    /// see the struct docs.
    pub async fn open(
        worker_factory: &dyn WorkerFactory,
        source_factory: &dyn AudioSourceFactory,
        config: SessionConfig,
        on_keyword: impl FnMut(&str) + Send + 'static,
        on_inference: impl FnMut(&Inference) + Send + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut session = Self {
            source: None,
            worker: None,
            on_keyword: Box::new(on_keyword),
            on_inference: Box::new(on_inference),
            context_info: None,
            loaded: false,
            listening: false,
            error: false,
            error_message: None,
            phase: Phase::WakeWord,
        };

        let worker_config = SessionConfig {
            start: true,
            ..config.clone()
        };
        let mut worker = match worker_factory.create(worker_config).await {
            Ok(worker) => worker,
            Err(e) => {
                log::error!("session: worker setup failed: {e}");
                session.error = true;
                session.error_message = Some(e.to_string());
                return Ok(session);
            }
        };

        // Prime the context-info field; the reply lands in poll_events.
        worker.command(WorkerRequest::Info);

        let source = match source_factory.create(worker.frame_sink(), config.start).await {
            Ok(source) => source,
            Err(e) => {
                log::error!("session: audio source setup failed: {e}");
                worker.release();
                session.error = true;
                session.error_message = Some(e.to_string());
                return Ok(session);
            }
        };

        session.listening = source.is_recording();
        session.loaded = true;
        session.source = Some(source);
        session.worker = Some(worker);
        log::info!("session: open (listening: {})", session.listening);
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Event pump
    // -----------------------------------------------------------------------

    /// Drain all pending worker events, updating state and invoking the
    /// callbacks.  Returns how many events were handled.
    ///
    /// Call this regularly from the owning context's update loop.
    pub fn poll_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(event) = self.worker.as_mut().and_then(WorkerHandle::try_event) else {
                return handled;
            };
            handled += 1;
            match event {
                WorkerResponse::Keyword { label } => {
                    log::debug!("session: keyword '{label}'");
                    self.phase = Phase::Intent;
                    (self.on_keyword)(&label);
                }
                WorkerResponse::Inference { inference } => {
                    log::debug!(
                        "session: inference (understood: {})",
                        inference.is_understood
                    );
                    self.phase = Phase::WakeWord;
                    (self.on_inference)(&inference);
                }
                WorkerResponse::Info { info } => {
                    self.context_info = Some(info);
                }
                WorkerResponse::Ready => {
                    // Already consumed by the factory handshake for this
                    // worker; a stray one carries no new information.
                }
                WorkerResponse::InitError { error } => {
                    log::error!("session: engine reported init failure: {error}");
                    self.error = true;
                    self.error_message = Some(error);
                    self.loaded = false;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    /// Start (or restart) audio delivery.  Returns `false` as a no-op
    /// indicator when no audio source exists.
    pub fn start(&mut self) -> bool {
        let Some(source) = self.source.as_mut() else {
            return false;
        };
        source.start();
        self.listening = true;
        true
    }

    /// Pause audio delivery.  Returns `false` as a no-op indicator when no
    /// audio source exists.
    pub fn pause(&mut self) -> bool {
        let Some(source) = self.source.as_mut() else {
            return false;
        };
        source.pause();
        self.listening = false;
        true
    }

    /// Swap both callbacks without touching the worker or the audio source.
    /// Subsequent events are delivered to the new closures.
    pub fn set_callbacks(
        &mut self,
        on_keyword: impl FnMut(&str) + Send + 'static,
        on_inference: impl FnMut(&Inference) + Send + 'static,
    ) {
        self.on_keyword = Box::new(on_keyword);
        self.on_inference = Box::new(on_inference);
    }

    /// Release the audio source, then the worker.  Idempotent; also invoked
    /// on drop.
    pub fn close(&mut self) {
        if self.source.is_none() && self.worker.is_none() {
            return;
        }
        // Frames must stop flowing before the engine goes away.
        if let Some(mut source) = self.source.take() {
            source.release();
        }
        if let Some(mut worker) = self.worker.take() {
            worker.release();
        }
        self.loaded = false;
        self.listening = false;
        log::info!("session: closed");
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Source description of the loaded context model, once reported.
    pub fn context_info(&self) -> Option<&str> {
        self.context_info.as_deref()
    }

    /// Whether setup completed and the engine is live.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether the audio source is delivering frames.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether setup or a later init reported a failure.
    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Description of the most recent failure, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Which engine stage the next event is expected from.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Direct access to the audio source, for callers that need more than
    /// start/pause.
    pub fn audio_source_mut(&mut self) -> Option<&mut dyn AudioSource> {
        match self.source.as_deref_mut() {
            Some(source) => Some(source),
            None => None,
        }
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
