//! voxquery Whisper crate - turns a captured utterance into text.
//!
//! [`TranscriptionService`] is the seam the capture step calls. The real
//! [`WhisperService`] needs the `whisper` feature and a GGML model file;
//! [`MockTranscriptionService`] answers with a fixed sentence for tests and
//! offline runs.

pub mod whisper_service;

use std::future::Future;

use voxquery_core::config::WhisperModelConfig;
use voxquery_core::error::VoxQueryError;

pub use whisper_service::{resample_linear, WhisperService, WHISPER_SAMPLE_RATE};

// =============================================================================
// Configuration
// =============================================================================

/// Resolved settings for [`WhisperService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhisperConfig {
    /// GGML model file. Empty when none is configured.
    pub model_path: String,
    /// ISO language code, or `"auto"` to let the model detect it.
    pub language: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            language: "en".to_string(),
        }
    }
}

impl From<&WhisperModelConfig> for WhisperConfig {
    fn from(config: &WhisperModelConfig) -> Self {
        Self {
            model_path: config.resolved_model_path(),
            language: config.language.clone(),
        }
    }
}

// =============================================================================
// Result types
// =============================================================================

/// One decoded span of speech, timed in seconds from the utterance start.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: f32,
    pub end: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    /// Segment texts joined with single spaces.
    pub text: String,
    pub segments: Vec<Segment>,
    /// Language the decoder ran with (`"auto"` when detected).
    pub language: String,
    pub duration_secs: f32,
}

// =============================================================================
// Trait
// =============================================================================

/// Speech-to-text over mono PCM samples in `[-1.0, 1.0]`.
pub trait TranscriptionService: Send + Sync {
    /// Transcribe `audio_data` recorded at `sample_rate` Hz.
    ///
    /// Empty audio and a zero sample rate are errors.
    fn transcribe(
        &self,
        audio_data: &[f32],
        sample_rate: u32,
    ) -> impl Future<Output = Result<TranscriptionResult, VoxQueryError>> + Send;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Answers every non-empty utterance with the same text.
#[derive(Debug, Clone)]
pub struct MockTranscriptionService {
    text: String,
}

impl Default for MockTranscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscriptionService {
    pub fn new() -> Self {
        Self::with_text("[mock transcription]")
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TranscriptionService for MockTranscriptionService {
    async fn transcribe(
        &self,
        audio_data: &[f32],
        sample_rate: u32,
    ) -> Result<TranscriptionResult, VoxQueryError> {
        whisper_service::check_input(audio_data, sample_rate)?;

        let duration_secs = audio_data.len() as f32 / sample_rate as f32;
        tracing::debug!(duration_secs, sample_rate, "Mock transcription generated");

        Ok(TranscriptionResult {
            text: self.text.clone(),
            segments: vec![Segment {
                start: 0.0,
                end: duration_secs,
                text: self.text.clone(),
            }],
            language: "en".to_string(),
            duration_secs,
        })
    }
}
