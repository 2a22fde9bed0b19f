//! Audio-source layer: the [`AudioSource`] trait the session owns, its
//! asynchronous factory seam, and the push-based in-process implementation.

pub mod push;
pub mod source;

pub use push::{PushHandle, PushSource, PushSourceFactory};
pub use source::{AudioSource, AudioSourceFactory, SourceError};

#[cfg(test)]
pub use source::{MockAudioSource, MockSourceFactory, MockSourceState};
