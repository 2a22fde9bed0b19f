//! Hark — session plumbing for a wake-word + intent-inference engine pair.
//!
//! The crate owns no audio hardware and no recognition models itself.  It
//! provides the glue around an engine: a background worker that runs the
//! engine off the caller's thread, a push-style audio path that feeds it,
//! and a session controller that turns worker events into two callbacks
//! (wake word detected, intent inferred).
//!
//! # Architecture
//!
//! ```text
//! producer thread                         worker task (tokio)
//! PushHandle::push(frame)
//!        │
//!        ▼
//! PushSource ──► FrameSink ──► run_worker()
//!   (gates on start/pause)          │
//!                                   ├─ VoiceEngine::process(frame)
//!                                   │        │ sync callbacks
//!                                   │        ▼
//!                                   └──► event channel (unbounded)
//!                                            │
//! caller's update loop                       ▼
//! VoiceSession::poll_events() ──► on_keyword / on_inference
//! ```
//!
//! Commands travel the other way on a bounded channel: `init`, `process`,
//! `pause`, `resume`, `reset`, `release`, `info`.  The worker handles them
//! strictly in order, so control changes take effect between frames, never
//! mid-frame.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hark::audio::PushSourceFactory;
//! use hark::config::SessionConfig;
//! use hark::session::VoiceSession;
//! use hark::voice::StubEngineFactory;
//! use hark::worker::EngineWorkerFactory;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SessionConfig::load()?;
//!     let workers = EngineWorkerFactory::new(Arc::new(StubEngineFactory::new()));
//!     let sources = PushSourceFactory::new();
//!
//!     let mut session = VoiceSession::open(
//!         &workers,
//!         &sources,
//!         config,
//!         |label| println!("wake word: {label}"),
//!         |inference| println!("{inference}"),
//!     )
//!     .await?;
//!
//!     // Feed 512-sample frames through `sources.handle()` and call
//!     // `session.poll_events()` from your update loop.
//!     session.close();
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod config;
pub mod session;
pub mod voice;
pub mod worker;

/// Sample rate every engine in this crate expects, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;

/// Samples per audio frame handed to [`voice::VoiceEngine::process`].
pub const FRAME_LENGTH: usize = 512;
