//! Audio-source abstraction.
//!
//! The session never captures audio itself; it owns an [`AudioSource`] built
//! by an injected [`AudioSourceFactory`] and wired to the worker through a
//! [`FrameSink`].  Start/pause are infallible toggles — a source that cannot
//! record simply stays silent.

use async_trait::async_trait;
use thiserror::Error;

use crate::worker::FrameSink;

#[cfg(test)]
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Errors that can occur while constructing an audio source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no capture device available")]
    NoDevice,

    #[error("failed to start capture stream: {0}")]
    Stream(String),
}

// ---------------------------------------------------------------------------
// AudioSource trait
// ---------------------------------------------------------------------------

/// A running audio producer bound to one worker.
///
/// Implementations deliver [`crate::FRAME_LENGTH`]-sample frames through the
/// [`FrameSink`] they were created with, but only while recording.
pub trait AudioSource: Send {
    /// Begin delivering frames.
    fn start(&mut self);

    /// Stop delivering frames; capture resources stay allocated.
    fn pause(&mut self);

    /// Whether frames are currently being delivered.
    fn is_recording(&self) -> bool;

    /// Detach from the worker and free capture resources.  Implementations
    /// also call this from `Drop`, so an unreleased source never leaks.
    fn release(&mut self);
}

// Compile-time assertion: Box<dyn AudioSource> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioSource>) {}
};

// ---------------------------------------------------------------------------
// AudioSourceFactory trait
// ---------------------------------------------------------------------------

/// Asynchronous audio-source constructor, injected into the session.
#[async_trait]
pub trait AudioSourceFactory: Send + Sync {
    /// Build a source that feeds `sink`; `start` controls whether it records
    /// immediately or waits for [`AudioSource::start`].
    async fn create(
        &self,
        sink: FrameSink,
        start: bool,
    ) -> Result<Box<dyn AudioSource>, SourceError>;
}

// ---------------------------------------------------------------------------
// MockAudioSource / MockSourceFactory  (test-only)
// ---------------------------------------------------------------------------

/// Observable state of a [`MockAudioSource`], shared with the factory that
/// built it.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockSourceState {
    pub recording: bool,
    pub released: bool,
    pub start_calls: usize,
    pub pause_calls: usize,
}

/// A source that records nothing and only tracks the calls made on it.
#[cfg(test)]
pub struct MockAudioSource {
    state: Arc<Mutex<MockSourceState>>,
}

#[cfg(test)]
impl AudioSource for MockAudioSource {
    fn start(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.start_calls += 1;
        state.recording = true;
    }

    fn pause(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.pause_calls += 1;
        state.recording = false;
    }

    fn is_recording(&self) -> bool {
        self.state.lock().unwrap().recording
    }

    fn release(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.released = true;
        state.recording = false;
    }
}

#[cfg(test)]
impl Drop for MockAudioSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Factory for [`MockAudioSource`]s.  Retains the state of every source it
/// built plus the [`FrameSink`] each one received, so tests can both inspect
/// teardown and push frames past the source.
#[cfg(test)]
pub struct MockSourceFactory {
    fail: bool,
    states: Arc<Mutex<Vec<Arc<Mutex<MockSourceState>>>>>,
    sinks: Arc<Mutex<Vec<FrameSink>>>,
}

#[cfg(test)]
impl MockSourceFactory {
    pub fn new() -> Self {
        Self {
            fail: false,
            states: Arc::new(Mutex::new(Vec::new())),
            sinks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A factory whose `create` always fails with [`SourceError::NoDevice`].
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn created(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    /// State of the most recently created source.
    pub fn last_state(&self) -> Option<Arc<Mutex<MockSourceState>>> {
        self.states.lock().unwrap().last().cloned()
    }

    /// Sink handed to the most recently created source.
    pub fn last_sink(&self) -> Option<FrameSink> {
        self.sinks.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl AudioSourceFactory for MockSourceFactory {
    async fn create(
        &self,
        sink: FrameSink,
        start: bool,
    ) -> Result<Box<dyn AudioSource>, SourceError> {
        if self.fail {
            return Err(SourceError::NoDevice);
        }
        self.sinks.lock().unwrap().push(sink);
        let state = Arc::new(Mutex::new(MockSourceState {
            recording: start,
            ..Default::default()
        }));
        self.states.lock().unwrap().push(Arc::clone(&state));
        Ok(Box::new(MockAudioSource { state }))
    }
}
