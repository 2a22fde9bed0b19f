//! Core voice-engine trait and construction types.
//!
//! # Overview
//!
//! [`VoiceEngine`] is the interface the worker drives: an opaque wake-word +
//! intent-inference pair that consumes PCM frames and reports detections
//! through the two callbacks registered at construction.  It is object-safe
//! and `Send` so it can be moved into the worker task behind a
//! `Box<dyn VoiceEngine>`.
//!
//! [`EngineFactory`] is the asynchronous constructor seam.  The crate ships
//! [`StubEngineFactory`](crate::voice::StubEngineFactory) for development;
//! real engine bindings implement the same pair of traits.
//!
//! [`MockEngine`] / [`MockEngineFactory`] (available under `#[cfg(test)]`)
//! record every call and fire callbacks on marker frames — useful for
//! unit-testing the worker and session without any signal processing.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::{Arc, Mutex};

use crate::config::SessionConfig;
use crate::voice::inference::Inference;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// All errors that can arise from an engine implementation.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A keyword or context model file was not found at the given path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The engine failed to initialise from the given models.
    #[error("engine initialisation failed: {0}")]
    Init(String),

    /// An error occurred while processing a frame.
    #[error("processing error: {0}")]
    Process(String),
}

// ---------------------------------------------------------------------------
// EngineCallbacks / EngineArgs
// ---------------------------------------------------------------------------

/// The two detection callbacks an engine fires, fixed for its lifetime.
///
/// Both are invoked synchronously from inside [`VoiceEngine::process`], so
/// they must not block.
pub struct EngineCallbacks {
    /// Invoked with the keyword label each time the wake word is detected.
    pub on_keyword: Box<dyn Fn(&str) + Send>,
    /// Invoked with the result each time an intent-inference pass concludes.
    pub on_inference: Box<dyn Fn(Inference) + Send>,
}

impl EngineCallbacks {
    pub fn new(
        on_keyword: impl Fn(&str) + Send + 'static,
        on_inference: impl Fn(Inference) + Send + 'static,
    ) -> Self {
        Self {
            on_keyword: Box::new(on_keyword),
            on_inference: Box::new(on_inference),
        }
    }

    /// Callbacks that drop every event.
    #[cfg(test)]
    pub fn discard() -> Self {
        Self::new(|_| {}, |_| {})
    }
}

/// Everything a factory needs to construct an engine: the session
/// configuration (model specs, sensitivities) merged with the event
/// callbacks.
pub struct EngineArgs {
    pub config: SessionConfig,
    pub callbacks: EngineCallbacks,
}

impl std::fmt::Debug for EngineArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineArgs")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// VoiceEngine trait
// ---------------------------------------------------------------------------

/// Object-safe interface for a wake-word + intent-inference engine pair.
///
/// Implementations must be `Send` so the engine can be moved into the worker
/// task, which then holds exclusive `&mut` access — no interior locking is
/// required.
///
/// # Contract
///
/// - `frame` must be [`frame_length`] **16 kHz, mono, i16** PCM samples.
/// - Detections are delivered through the [`EngineCallbacks`] registered at
///   construction, never through return values.
/// - Dropping the engine releases all native resources.
///
/// [`frame_length`]: VoiceEngine::frame_length
pub trait VoiceEngine: Send {
    /// Feed one frame of audio through both engine stages.
    fn process(&mut self, frame: &[i16]) -> Result<(), EngineError>;

    /// Return the engine to wake-word listening, discarding any partially
    /// captured command.
    fn reset(&mut self) -> Result<(), EngineError>;

    /// Source description of the loaded context model.
    fn context_info(&self) -> &str;

    /// Number of samples expected per [`process`] call.
    ///
    /// [`process`]: VoiceEngine::process
    fn frame_length(&self) -> usize {
        crate::FRAME_LENGTH
    }

    /// Expected input sample rate in Hz.
    fn sample_rate(&self) -> u32 {
        crate::SAMPLE_RATE
    }
}

// Compile-time assertion: Box<dyn VoiceEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn VoiceEngine>) {}
};

// ---------------------------------------------------------------------------
// EngineFactory trait
// ---------------------------------------------------------------------------

/// Asynchronous engine constructor, injected into the worker so callers can
/// swap implementations (stub, real bindings, test doubles).
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Build an engine from `args`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ModelNotFound`] — a referenced model file is missing.
    /// - [`EngineError::Init`] — the models could not be loaded.
    async fn create(&self, args: EngineArgs) -> Result<Box<dyn VoiceEngine>, EngineError>;
}

// ---------------------------------------------------------------------------
// MockEngine / MockEngineFactory  (test-only)
// ---------------------------------------------------------------------------

/// One recorded call on a [`MockEngine`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `process` was invoked with a frame of this length.
    Process(usize),
    /// `reset` was invoked.
    Reset,
    /// The engine was dropped, i.e. released.
    Dropped,
}

/// A test double that records every call into a shared log and fires its
/// callbacks when fed marker frames, without any signal processing.
#[cfg(test)]
pub struct MockEngine {
    label: String,
    callbacks: EngineCallbacks,
    calls: Arc<Mutex<Vec<MockCall>>>,
    info: String,
}

#[cfg(test)]
impl MockEngine {
    /// First-sample marker that makes `process` fire the keyword callback.
    pub const KEYWORD_MARKER: i16 = 1;
    /// First-sample marker that makes `process` fire an understood inference.
    pub const INFERENCE_MARKER: i16 = 2;
    /// First-sample marker that makes `process` fire a not-understood
    /// inference.
    pub const MISS_MARKER: i16 = 3;
    /// First-sample marker that makes `process` return an error after
    /// recording the call.
    pub const ERROR_MARKER: i16 = 4;

    pub fn keyword_frame() -> Vec<i16> {
        vec![Self::KEYWORD_MARKER; crate::FRAME_LENGTH]
    }

    pub fn inference_frame() -> Vec<i16> {
        vec![Self::INFERENCE_MARKER; crate::FRAME_LENGTH]
    }

    pub fn miss_frame() -> Vec<i16> {
        vec![Self::MISS_MARKER; crate::FRAME_LENGTH]
    }

    pub fn error_frame() -> Vec<i16> {
        vec![Self::ERROR_MARKER; crate::FRAME_LENGTH]
    }

    pub fn silent_frame() -> Vec<i16> {
        vec![0; crate::FRAME_LENGTH]
    }

    /// The canned result fired for [`Self::INFERENCE_MARKER`] frames.
    pub fn canned_inference() -> Inference {
        let mut slots = std::collections::BTreeMap::new();
        slots.insert("size".to_string(), "small".to_string());
        Inference::understood("testIntent", slots)
    }
}

#[cfg(test)]
impl Drop for MockEngine {
    fn drop(&mut self) {
        self.calls.lock().unwrap().push(MockCall::Dropped);
    }
}

#[cfg(test)]
impl VoiceEngine for MockEngine {
    fn process(&mut self, frame: &[i16]) -> Result<(), EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push(MockCall::Process(frame.len()));
        match frame.first() {
            Some(&Self::KEYWORD_MARKER) => (self.callbacks.on_keyword)(&self.label),
            Some(&Self::INFERENCE_MARKER) => {
                (self.callbacks.on_inference)(Self::canned_inference())
            }
            Some(&Self::MISS_MARKER) => (self.callbacks.on_inference)(Inference::miss()),
            Some(&Self::ERROR_MARKER) => {
                return Err(EngineError::Process("marker frame".into()))
            }
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(MockCall::Reset);
        Ok(())
    }

    fn context_info(&self) -> &str {
        &self.info
    }
}

/// Factory for [`MockEngine`]s.  Counts `create` calls and shares one call
/// log across every engine it builds, so tests can assert what reached the
/// engine regardless of re-initialisation.
#[cfg(test)]
pub struct MockEngineFactory {
    created: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    fail_with: Option<String>,
}

#[cfg(test)]
impl MockEngineFactory {
    /// A factory whose `create` always succeeds.
    pub fn new() -> Self {
        Self {
            created: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    /// A factory whose `create` always fails with `EngineError::Init(msg)`.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            fail_with: Some(msg.into()),
            ..Self::new()
        }
    }

    /// Number of `create` calls so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Shared call log of every engine built by this factory.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl EngineFactory for MockEngineFactory {
    async fn create(&self, args: EngineArgs) -> Result<Box<dyn VoiceEngine>, EngineError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = &self.fail_with {
            return Err(EngineError::Init(msg.clone()));
        }
        let label = args
            .config
            .keyword
            .as_ref()
            .map(|k| k.label.clone())
            .unwrap_or_else(|| "mock".to_string());
        Ok(Box::new(MockEngine {
            label,
            callbacks: args.callbacks,
            calls: Arc::clone(&self.calls),
            info: "mock context".to_string(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
