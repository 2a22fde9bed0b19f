//! Caller-facing session layer: owns a worker and an audio source, pumps
//! worker events into user callbacks.

pub mod controller;

pub use controller::{InferenceCallback, KeywordCallback, Phase, VoiceSession};
