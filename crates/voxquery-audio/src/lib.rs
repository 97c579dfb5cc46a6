//! voxquery Audio crate - microphone input, voice activity detection, and the
//! capture-and-transcribe step of a turn.
//!
//! Provides trait-based abstractions for audio sources and voice activity
//! detection, a bounded [`Listener`] that waits for speech and records one
//! utterance, and [`MicrophoneCapture`], which chains listening, a temporary
//! recording spool, and transcription into a single collaborator that never
//! returns an error to the session loop.

pub mod capture;
pub mod listener;
pub mod microphone;
pub mod spool;

use std::collections::VecDeque;
use std::future::Future;

use voxquery_core::error::VoxQueryError;

pub use capture::{CaptureOutcome, MicrophoneCapture, ScriptedCapture, SpeechCapture};
pub use listener::{ListenConfig, ListenOutcome, Listener};
pub use microphone::{MicrophoneConfig, MicrophoneSource};
pub use spool::RecordingSpool;

// =============================================================================
// Enums
// =============================================================================

/// Result of voice activity detection on an audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadResult {
    /// Speech was detected in the audio frame.
    Speech,
    /// The audio frame contains only silence or background noise.
    Silence,
    /// The detector could not determine the content (e.g., empty frame).
    Unknown,
}

// =============================================================================
// Traits
// =============================================================================

/// A stream of mono PCM audio.
pub trait AudioSource: Send {
    /// Sample rate of the frames produced by this source, in Hz.
    fn sample_rate(&self) -> u32;

    /// Read the next `len` samples.
    ///
    /// Returns `Ok(None)` once the source is exhausted. The final frame may
    /// be shorter than `len`.
    fn read_frame(
        &mut self,
        len: usize,
    ) -> impl Future<Output = Result<Option<Vec<f32>>, VoxQueryError>> + Send;

    /// Drop audio buffered before this call, so a new turn does not hear
    /// what was said while the operator was answering a prompt.
    fn discard_pending(&mut self) {}
}

/// Voice activity detector for audio frames.
pub trait VoiceActivityDetector: Send + Sync {
    /// Detect whether the given audio frame contains speech.
    ///
    /// # Arguments
    /// * `audio_frame` - PCM audio samples as f32 values in [-1.0, 1.0].
    fn detect(&self, audio_frame: &[f32]) -> VadResult;
}

// =============================================================================
// Energy VAD
// =============================================================================

/// Root-mean-square level of a frame. Zero for an empty frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = frame.iter().map(|s| s * s).sum();
    (sum_sq / frame.len() as f32).sqrt()
}

/// Classifies frames by RMS energy against a threshold.
#[derive(Debug, Clone)]
pub struct EnergyVad {
    threshold: f32,
}

impl EnergyVad {
    /// Ambient level multiplier used by [`EnergyVad::calibrated`].
    pub const AMBIENT_FACTOR: f32 = 3.0;

    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Build a detector whose threshold sits above the measured background
    /// noise, never dropping below `floor`.
    pub fn calibrated(floor: f32, ambient: &[f32]) -> Self {
        let ambient_rms = rms(ambient);
        let threshold = floor.max(ambient_rms * Self::AMBIENT_FACTOR);
        tracing::debug!(ambient_rms, threshold, "Calibrated energy threshold");
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn detect(&self, audio_frame: &[f32]) -> VadResult {
        if audio_frame.is_empty() {
            return VadResult::Unknown;
        }

        if rms(audio_frame) > self.threshold {
            VadResult::Speech
        } else {
            VadResult::Silence
        }
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// In-memory audio source for tests.
///
/// Serves samples from a fixed buffer, frame by frame, then reports
/// exhaustion.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    samples: VecDeque<f32>,
    sample_rate: u32,
}

impl MockAudioSource {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Concatenate `(duration_ms, amplitude)` segments of a constant signal
    /// with alternating sign, which has RMS equal to `amplitude`.
    pub fn from_segments(segments: &[(u32, f32)], sample_rate: u32) -> Self {
        let mut samples = Vec::new();
        for &(duration_ms, amplitude) in segments {
            let count = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
            samples.extend((0..count).map(|i| if i % 2 == 0 { amplitude } else { -amplitude }));
        }
        Self::new(samples, sample_rate)
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl AudioSource for MockAudioSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn read_frame(&mut self, len: usize) -> Result<Option<Vec<f32>>, VoxQueryError> {
        if self.samples.is_empty() {
            return Ok(None);
        }
        let take = len.min(self.samples.len());
        Ok(Some(self.samples.drain(..take).collect()))
    }
}

// =============================================================================
// Tests
// =============================================================================
