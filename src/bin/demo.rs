//! hark-demo — end-to-end session demo against the built-in stub engine.
//!
//! Synthesises a repeating audio pattern (silence, a loud burst, more
//! silence) and pushes it through a [`PushSourceFactory`] into a live
//! [`VoiceSession`].  The stub engine treats each burst as the wake word and
//! the trailing speech as an utterance, so the console shows the full
//! keyword → inference cycle without any microphone or model files.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).  Ctrl-C exits.

use std::sync::Arc;
use std::time::Duration;

use hark::audio::{PushHandle, PushSourceFactory};
use hark::config::{AppPaths, ContextSpec, KeywordSpec, SessionConfig};
use hark::session::VoiceSession;
use hark::voice::StubEngineFactory;
use hark::worker::EngineWorkerFactory;
use hark::{FRAME_LENGTH, SAMPLE_RATE};

// ---------------------------------------------------------------------------
// Synthetic microphone
// ---------------------------------------------------------------------------

/// Real-time spacing between frames.
const FRAME_PERIOD: Duration =
    Duration::from_millis(FRAME_LENGTH as u64 * 1000 / SAMPLE_RATE as u64);

/// Burst amplitude, comfortably above the stub's default energy threshold.
const BURST_AMPLITUDE: i16 = 8_000;

/// Per-frame amplitude script for one demo cycle: idle, a burst long enough
/// to wake the stub and register as speech, then enough silence for its
/// endpoint detector to close the utterance and the refractory hold to
/// expire.
fn cycle_amplitudes() -> Vec<i16> {
    let mut plan = vec![0; 20];
    plan.extend(std::iter::repeat(BURST_AMPLITUDE).take(10));
    plan.extend(std::iter::repeat(0).take(40));
    plan
}

async fn run_microphone(producer: PushHandle) {
    let plan = cycle_amplitudes();
    let mut ticker = tokio::time::interval(FRAME_PERIOD);
    let mut step = 0usize;
    loop {
        ticker.tick().await;
        let amplitude = plan[step % plan.len()];
        step += 1;
        let _ = producer.push(vec![amplitude; FRAME_LENGTH]);
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("hark demo starting up");

    // 2. Configuration — fill anything missing with stub-friendly defaults.
    let paths = AppPaths::new();
    let first_run = SessionConfig::is_first_run();
    let mut config = SessionConfig::load().unwrap_or_else(|e| {
        log::warn!("failed to load config ({e}); using defaults");
        SessionConfig::default()
    });
    config
        .keyword
        .get_or_insert_with(|| KeywordSpec::new("hey hark", paths.models_dir.join("hey-hark.ppn")));
    config
        .context
        .get_or_insert_with(|| ContextSpec::new(paths.models_dir.join("coffee-maker.rhn")));
    if first_run {
        if let Err(e) = config.save() {
            log::warn!("could not write initial config: {e}");
        }
    }

    // 3. Factories — stub engine behind the worker, push-style audio.
    let workers = EngineWorkerFactory::new(Arc::new(StubEngineFactory::new()));
    let sources = PushSourceFactory::new();

    // 4. Session
    let mut session = VoiceSession::open(
        &workers,
        &sources,
        config,
        |label| println!("[wake word] {label}"),
        |inference| println!("{inference}"),
    )
    .await?;
    if session.is_error() {
        anyhow::bail!(
            "session setup failed: {}",
            session.error_message().unwrap_or("unknown error")
        );
    }

    // The context-info reply arrives asynchronously; give it a beat.
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.poll_events();
    if let Some(info) = session.context_info() {
        println!("{info}");
    }

    // 5. Synthetic microphone task
    let producer = sources
        .handle()
        .ok_or_else(|| anyhow::anyhow!("audio source missing"))?;
    let microphone = tokio::spawn(run_microphone(producer));
    println!("synthesising audio bursts; ctrl-c to quit");

    // 6. Event loop
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.poll_events();
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                log::info!("shutting down");
                break;
            }
        }
    }

    // 7. Teardown — audio stops first, close() releases source then worker.
    microphone.abort();
    session.close();
    Ok(())
}
