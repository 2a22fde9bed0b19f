//! Configuration module.
//!
//! Provides `SessionConfig` (keyword/context model specs plus the start
//! flag), `AppPaths` for cross-platform data directories, and TOML
//! persistence via `SessionConfig::load` / `SessionConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{ConfigError, ContextSpec, KeywordSpec, SessionConfig};
