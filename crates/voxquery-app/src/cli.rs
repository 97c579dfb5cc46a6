//! CLI argument definitions for the voxquery binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use voxquery_core::config::VoxQueryConfig;

/// voxquery - speak a request, get a SQL query back.
#[derive(Parser, Debug)]
#[command(name = "voxquery", version, about)]
pub struct CliArgs {
    /// Path to a TOML configuration file. Defaults are used when absent.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Seconds to wait for speech to start.
    #[arg(long = "listen-timeout")]
    pub listen_timeout: Option<u32>,

    /// Maximum utterance length in seconds.
    #[arg(long = "max-duration")]
    pub max_duration: Option<u32>,

    /// Completion model identifier.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Path to a Whisper GGML model file.
    #[arg(long = "whisper-model")]
    pub whisper_model: Option<PathBuf>,

    /// Type requests on the keyboard instead of speaking them.
    #[arg(long = "typed")]
    pub typed: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > VOXQUERY_CONFIG env var. `None` means run on
    /// defaults without reading any file.
    pub fn resolve_config_path(&self) -> Option<PathBuf> {
        if let Some(ref p) = self.config {
            return Some(p.clone());
        }
        std::env::var("VOXQUERY_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Resolve the log filter directive.
    ///
    /// Priority: --log-level flag > RUST_LOG env var > config file value.
    /// Returns `None` when `RUST_LOG` should be used as is.
    pub fn resolve_log_level(&self, config_level: &str) -> Option<String> {
        if let Some(ref level) = self.log_level {
            return Some(level.clone());
        }
        if std::env::var("RUST_LOG").is_ok_and(|v| !v.is_empty()) {
            return None;
        }
        Some(config_level.to_string())
    }

    /// Apply flag and env var overrides on top of the loaded configuration.
    ///
    /// Priority: flag > VOXQUERY_MODEL / VOXQUERY_BASE_URL env vars > file.
    pub fn apply_overrides(&self, config: &mut VoxQueryConfig) {
        if let Some(secs) = self.listen_timeout {
            config.capture.listen_timeout_secs = secs;
        }
        if let Some(secs) = self.max_duration {
            config.capture.max_utterance_secs = secs;
        }
        if let Some(model) = resolve_string(&self.model, "VOXQUERY_MODEL") {
            config.completion.model = model;
        }
        if let Some(url) = resolve_string(&self.base_url, "VOXQUERY_BASE_URL") {
            config.completion.base_url = url;
        }
        if let Some(ref path) = self.whisper_model {
            config.whisper.model_path = path.to_string_lossy().to_string();
        }
    }
}

fn resolve_string(flag: &Option<String>, env_var: &str) -> Option<String> {
    if let Some(value) = flag {
        return Some(value.clone());
    }
    std::env::var(env_var).ok().filter(|v| !v.is_empty())
}
