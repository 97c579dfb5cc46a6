use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, VoxQueryError};

/// Instruction that fixes the assistant's role for every completion request.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You're a data scientist helping with SQL queries. Respond only with the SQL query, no explanations.";

/// Top-level configuration for voxquery.
///
/// Built from defaults. A TOML file is only read when the operator names one
/// explicitly (`--config` or `VOXQUERY_CONFIG`); nothing is persisted between
/// runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoxQueryConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub whisper: WhisperModelConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl VoxQueryConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VoxQueryConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Write the configuration as TOML, e.g. to produce a starting template.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| VoxQueryError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Microphone listening bounds and voice activity detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum time to wait for speech to start, in seconds.
    pub listen_timeout_secs: u32,
    /// Maximum duration of one utterance once speech has started, in seconds.
    pub max_utterance_secs: u32,
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Frame length used for voice activity decisions, in milliseconds.
    pub frame_ms: u32,
    /// Audio consumed up front to measure background noise, in milliseconds.
    pub ambient_calibration_ms: u32,
    /// Lower bound for the RMS speech threshold.
    pub vad_threshold: f32,
    /// Silence after speech that ends the utterance, in milliseconds.
    pub trailing_silence_ms: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            listen_timeout_secs: 5,
            max_utterance_secs: 10,
            sample_rate: 16_000,
            frame_ms: 30,
            ambient_calibration_ms: 500,
            vad_threshold: 0.02,
            trailing_silence_ms: 1_200,
        }
    }
}

/// Speech-to-text model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperModelConfig {
    /// Path to a GGML model file. Empty means `ggml-<model_size>.bin` in the
    /// working directory.
    pub model_path: String,
    /// Whisper model size: "tiny", "base", "small", "medium", "large".
    pub model_size: String,
    /// Language code, or "auto".
    pub language: String,
}

impl Default for WhisperModelConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            model_size: "tiny".to_string(),
            language: "en".to_string(),
        }
    }
}

impl WhisperModelConfig {
    /// The model file to load, derived from `model_size` when no explicit
    /// path is configured.
    pub fn resolved_model_path(&self) -> String {
        if self.model_path.is_empty() {
            format!("ggml-{}.bin", self.model_size)
        } else {
            self.model_path.clone()
        }
    }
}

/// Completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Upper bound on one completion call, in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature; backend default when unset.
    pub temperature: Option<f32>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 30,
            temperature: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Translation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// System message sent first in every completion request.
    pub system_prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}
