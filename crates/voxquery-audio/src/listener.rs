//! Bounded listening for a single utterance.
//!
//! Time is measured in samples read from the source, so a live microphone
//! and a scripted buffer follow the same rules:
//! 1. calibrate the energy threshold on a short stretch of background noise
//! 2. wait up to the listen timeout for a speech frame
//! 3. record until trailing silence or the maximum utterance duration

use std::collections::VecDeque;
use std::time::Duration;

use voxquery_core::config::CaptureConfig;
use voxquery_core::error::VoxQueryError;

use crate::{AudioSource, EnergyVad, VadResult, VoiceActivityDetector};

/// Frames kept from before speech onset so the first syllable is not clipped.
const PRE_ROLL_FRAMES: usize = 3;

/// Tuning for [`Listener`].
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Frame length for voice activity decisions, in milliseconds.
    pub frame_ms: u32,
    /// Background audio measured before listening, in milliseconds.
    pub ambient_calibration_ms: u32,
    /// Lower bound for the speech threshold.
    pub vad_threshold: f32,
    /// Silence after speech that ends the utterance, in milliseconds.
    pub trailing_silence_ms: u32,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

impl From<&CaptureConfig> for ListenConfig {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            frame_ms: config.frame_ms,
            ambient_calibration_ms: config.ambient_calibration_ms,
            vad_threshold: config.vad_threshold,
            trailing_silence_ms: config.trailing_silence_ms,
        }
    }
}

/// What one listening pass produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenOutcome {
    /// Mono PCM of the utterance, pre-roll included.
    Speech(Vec<f32>),
    /// No speech started before the listen timeout, or the source ended.
    NoSpeech,
}

/// Waits for speech and records one utterance from an [`AudioSource`].
#[derive(Debug, Clone, Default)]
pub struct Listener {
    config: ListenConfig,
}

fn samples_for(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_millis() as u64 * sample_rate as u64 / 1000) as usize
}

impl Listener {
    pub fn new(config: ListenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ListenConfig {
        &self.config
    }

    /// Listen for one utterance.
    ///
    /// `listen_timeout` bounds the wait for speech onset; `max_duration`
    /// bounds the utterance once it has started.
    pub async fn listen<S: AudioSource>(
        &self,
        source: &mut S,
        listen_timeout: Duration,
        max_duration: Duration,
    ) -> Result<ListenOutcome, VoxQueryError> {
        let rate = source.sample_rate();
        if rate == 0 {
            return Err(VoxQueryError::Audio(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        let frame_len = ((rate as u64 * self.config.frame_ms as u64) / 1000).max(1) as usize;

        // Step 1: ambient calibration.
        let calibration_len = samples_for(
            Duration::from_millis(self.config.ambient_calibration_ms as u64),
            rate,
        );
        let mut ambient = Vec::with_capacity(calibration_len);
        while ambient.len() < calibration_len {
            match source.read_frame(frame_len).await? {
                Some(frame) => ambient.extend_from_slice(&frame),
                None => {
                    tracing::debug!("Audio source ended during calibration");
                    return Ok(ListenOutcome::NoSpeech);
                }
            }
        }
        let vad = EnergyVad::calibrated(self.config.vad_threshold, &ambient);

        // Step 2: wait for speech onset.
        let timeout_len = samples_for(listen_timeout, rate);
        let mut waited = 0usize;
        let mut pre_roll: VecDeque<Vec<f32>> = VecDeque::with_capacity(PRE_ROLL_FRAMES);
        let mut recorded = loop {
            if waited >= timeout_len {
                tracing::debug!(waited_samples = waited, "No speech before listen timeout");
                return Ok(ListenOutcome::NoSpeech);
            }
            let Some(frame) = source.read_frame(frame_len).await? else {
                return Ok(ListenOutcome::NoSpeech);
            };
            waited += frame.len();
            if vad.detect(&frame) == VadResult::Speech {
                let mut recorded: Vec<f32> = pre_roll.into_iter().flatten().collect();
                recorded.extend_from_slice(&frame);
                break recorded;
            }
            if pre_roll.len() == PRE_ROLL_FRAMES {
                pre_roll.pop_front();
            }
            pre_roll.push_back(frame);
        };
        tracing::debug!(waited_ms = waited as u64 * 1000 / rate as u64, "Speech started");

        // Step 3: record until trailing silence or the phrase limit.
        let max_len = samples_for(max_duration, rate);
        let silence_len = samples_for(
            Duration::from_millis(self.config.trailing_silence_ms as u64),
            rate,
        );
        let mut silence_run = 0usize;
        while recorded.len() < max_len {
            let Some(frame) = source.read_frame(frame_len).await? else {
                break;
            };
            if vad.detect(&frame) == VadResult::Speech {
                silence_run = 0;
            } else {
                silence_run += frame.len();
            }
            recorded.extend_from_slice(&frame);
            if silence_run >= silence_len {
                tracing::debug!("Utterance ended on trailing silence");
                break;
            }
        }
        recorded.truncate(max_len);

        tracing::debug!(
            samples = recorded.len(),
            duration_ms = recorded.len() as u64 * 1000 / rate as u64,
            "Utterance recorded"
        );
        Ok(ListenOutcome::Speech(recorded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockAudioSource;

    const RATE: u32 = 16_000;

    fn listener() -> Listener {
        Listener::new(ListenConfig {
            frame_ms: 30,
            ambient_calibration_ms: 300,
            vad_threshold: 0.02,
            trailing_silence_ms: 600,
        })
    }

    #[test]
    fn test_listen_config_from_capture_config() {
        let config = ListenConfig::from(&CaptureConfig::default());
        assert_eq!(config.frame_ms, 30);
        assert_eq!(config.ambient_calibration_ms, 500);
        assert_eq!(config.trailing_silence_ms, 1_200);
    }

    #[tokio::test]
    async fn test_times_out_without_speech() {
        let mut source = MockAudioSource::from_segments(&[(300, 0.001), (8_000, 0.001)], RATE);
        let outcome = listener()
            .listen(&mut source, Duration::from_secs(5), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(outcome, ListenOutcome::NoSpeech);
        // Stopped after roughly five seconds of waiting, not at end of input.
        assert!(source.remaining() > 0);
    }

    #[tokio::test]
    async fn test_records_utterance_until_trailing_silence() {
        let mut source = MockAudioSource::from_segments(
            &[(300, 0.001), (600, 0.001), (1_500, 0.3), (2_000, 0.001)],
            RATE,
        );
        let outcome = listener()
            .listen(&mut source, Duration::from_secs(5), Duration::from_secs(10))
            .await
            .unwrap();

        let ListenOutcome::Speech(samples) = outcome else {
            panic!("expected speech");
        };
        let secs = samples.len() as f32 / RATE as f32;
        // 1.5 s of speech, up to 90 ms of pre-roll, ~0.6 s of trailing silence.
        assert!(secs > 2.0 && secs < 2.3, "recorded {secs} s");
        assert!(source.remaining() > 0);
    }

    #[tokio::test]
    async fn test_utterance_capped_at_max_duration() {
        let mut source = MockAudioSource::from_segments(&[(300, 0.001), (5_000, 0.3)], RATE);
        let outcome = listener()
            .listen(&mut source, Duration::from_secs(5), Duration::from_secs(2))
            .await
            .unwrap();

        let ListenOutcome::Speech(samples) = outcome else {
            panic!("expected speech");
        };
        assert_eq!(samples.len(), 2 * RATE as usize);
    }

    #[tokio::test]
    async fn test_source_ending_during_calibration_is_no_speech() {
        let mut source = MockAudioSource::from_segments(&[(100, 0.5)], RATE);
        let outcome = listener()
            .listen(&mut source, Duration::from_secs(5), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(outcome, ListenOutcome::NoSpeech);
    }

    #[tokio::test]
    async fn test_loud_background_is_not_speech() {
        // Steady noise at 0.05 calibrates the threshold to 0.15.
        let mut source = MockAudioSource::from_segments(&[(300, 0.05), (6_000, 0.05)], RATE);
        let outcome = listener()
            .listen(&mut source, Duration::from_secs(5), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(outcome, ListenOutcome::NoSpeech);
    }

    #[tokio::test]
    async fn test_source_ending_mid_utterance_keeps_audio() {
        let mut source = MockAudioSource::from_segments(&[(300, 0.001), (400, 0.3)], RATE);
        let outcome = listener()
            .listen(&mut source, Duration::from_secs(5), Duration::from_secs(10))
            .await
            .unwrap();
        let ListenOutcome::Speech(samples) = outcome else {
            panic!("expected speech");
        };
        assert_eq!(samples.len(), 400 * RATE as usize / 1000);
    }

    #[tokio::test]
    async fn test_zero_sample_rate_is_an_error() {
        let mut source = MockAudioSource::new(vec![0.0; 10], 0);
        let result = listener()
            .listen(&mut source, Duration::from_secs(1), Duration::from_secs(1))
            .await;
        assert!(result.is_err());
    }
}
