//! The capture-and-transcribe collaborator used by the session loop.
//!
//! [`SpeechCapture`] never fails: listening, spooling, and transcription
//! errors are folded into a [`CaptureOutcome`] at this boundary.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use voxquery_core::error::VoxQueryError;
use voxquery_whisper::TranscriptionService;

use crate::listener::{ListenOutcome, Listener};
use crate::spool::RecordingSpool;
use crate::AudioSource;

/// Slack on top of the listen bounds before a stalled device is abandoned.
const DEVICE_STALL_GRACE: Duration = Duration::from_secs(2);

/// What one capture step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Trimmed, non-empty transcription of the utterance.
    Utterance(String),
    /// No speech before the timeout, or speech that transcribed to nothing.
    NoSpeech,
    /// The audio device or the transcription engine failed.
    Failed(String),
}

/// Capture one utterance and turn it into text.
pub trait SpeechCapture: Send {
    fn capture_and_transcribe(
        &mut self,
        listen_timeout: Duration,
        max_duration: Duration,
    ) -> impl Future<Output = CaptureOutcome> + Send;
}

// =============================================================================
// Microphone + transcription
// =============================================================================

/// Listens on an [`AudioSource`], spools the utterance to a temporary file,
/// and transcribes it.
pub struct MicrophoneCapture<S, T> {
    source: S,
    listener: Listener,
    transcriber: T,
}

impl<S: AudioSource, T: TranscriptionService> MicrophoneCapture<S, T> {
    pub fn new(source: S, listener: Listener, transcriber: T) -> Self {
        Self {
            source,
            listener,
            transcriber,
        }
    }

    pub fn transcriber(&self) -> &T {
        &self.transcriber
    }

    async fn listen(
        &mut self,
        listen_timeout: Duration,
        max_duration: Duration,
    ) -> Result<ListenOutcome, VoxQueryError> {
        let calibration =
            Duration::from_millis(self.listener.config().ambient_calibration_ms as u64);
        let hard_limit = calibration + listen_timeout + max_duration + DEVICE_STALL_GRACE;

        self.source.discard_pending();
        match tokio::time::timeout(
            hard_limit,
            self.listener
                .listen(&mut self.source, listen_timeout, max_duration),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    limit_secs = hard_limit.as_secs_f32(),
                    "Audio device stalled; treating as no input"
                );
                Ok(ListenOutcome::NoSpeech)
            }
        }
    }

    async fn transcribe_spooled(
        transcriber: &T,
        sample_rate: u32,
        samples: &[f32],
    ) -> Result<String, VoxQueryError> {
        let mut spool = RecordingSpool::create(sample_rate)?;
        spool.write(samples)?;
        tracing::debug!(
            path = %spool.path().display(),
            duration_secs = spool.duration_secs(),
            "Utterance spooled"
        );

        let audio = spool.read_samples()?;
        let result = transcriber.transcribe(&audio, spool.sample_rate()).await?;
        Ok(result.text.trim().to_string())
    }
}

impl<S: AudioSource, T: TranscriptionService> SpeechCapture for MicrophoneCapture<S, T> {
    async fn capture_and_transcribe(
        &mut self,
        listen_timeout: Duration,
        max_duration: Duration,
    ) -> CaptureOutcome {
        let samples = match self.listen(listen_timeout, max_duration).await {
            Ok(ListenOutcome::Speech(samples)) if !samples.is_empty() => samples,
            Ok(_) => return CaptureOutcome::NoSpeech,
            Err(e) => {
                tracing::warn!(error = %e, "Audio capture failed");
                return CaptureOutcome::Failed(e.to_string());
            }
        };

        let sample_rate = self.source.sample_rate();
        match Self::transcribe_spooled(&self.transcriber, sample_rate, &samples).await {
            Ok(text) if text.is_empty() => {
                tracing::debug!("Transcription returned empty text");
                CaptureOutcome::NoSpeech
            }
            Ok(text) => {
                tracing::info!(text_len = text.len(), "Utterance transcribed");
                CaptureOutcome::Utterance(text)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Transcription failed");
                CaptureOutcome::Failed(e.to_string())
            }
        }
    }
}

// =============================================================================
// Scripted implementation
// =============================================================================

/// Capture collaborator that replays pre-set outcomes, for tests and demos.
///
/// Returns `NoSpeech` once the script is exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCapture {
    outcomes: VecDeque<CaptureOutcome>,
    calls: Vec<(Duration, Duration)>,
}

impl ScriptedCapture {
    pub fn new(outcomes: impl IntoIterator<Item = CaptureOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            calls: Vec::new(),
        }
    }

    /// `(listen_timeout, max_duration)` of every call so far.
    pub fn calls(&self) -> &[(Duration, Duration)] {
        &self.calls
    }
}

impl SpeechCapture for ScriptedCapture {
    async fn capture_and_transcribe(
        &mut self,
        listen_timeout: Duration,
        max_duration: Duration,
    ) -> CaptureOutcome {
        self.calls.push((listen_timeout, max_duration));
        self.outcomes.pop_front().unwrap_or(CaptureOutcome::NoSpeech)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ListenConfig;
    use crate::MockAudioSource;
    use voxquery_whisper::{MockTranscriptionService, TranscriptionResult};

    const RATE: u32 = 16_000;

    fn listener() -> Listener {
        Listener::new(ListenConfig {
            frame_ms: 30,
            ambient_calibration_ms: 300,
            vad_threshold: 0.02,
            trailing_silence_ms: 600,
        })
    }

    fn speech_source() -> MockAudioSource {
        MockAudioSource::from_segments(&[(300, 0.001), (300, 0.001), (900, 0.3), (1_000, 0.0)], RATE)
    }

    struct FailingTranscriber;

    impl TranscriptionService for FailingTranscriber {
        async fn transcribe(
            &self,
            _audio_data: &[f32],
            _sample_rate: u32,
        ) -> Result<TranscriptionResult, VoxQueryError> {
            Err(VoxQueryError::Transcription("model crashed".to_string()))
        }
    }

    #[tokio::test]
    async fn test_speech_is_transcribed_and_trimmed() {
        let transcriber = MockTranscriptionService::with_text("  show total revenue by region \n");
        let mut capture = MicrophoneCapture::new(speech_source(), listener(), transcriber);

        let outcome = capture
            .capture_and_transcribe(Duration::from_secs(5), Duration::from_secs(10))
            .await;
        assert_eq!(
            outcome,
            CaptureOutcome::Utterance("show total revenue by region".to_string())
        );
    }

    #[tokio::test]
    async fn test_silence_times_out_without_transcribing() {
        let source = MockAudioSource::from_segments(&[(300, 0.0), (6_000, 0.0)], RATE);
        let mut capture = MicrophoneCapture::new(source, listener(), FailingTranscriber);

        let outcome = capture
            .capture_and_transcribe(Duration::from_secs(5), Duration::from_secs(10))
            .await;
        // A failing transcriber would have produced `Failed` had it been called.
        assert_eq!(outcome, CaptureOutcome::NoSpeech);
    }

    #[tokio::test]
    async fn test_transcription_failure_is_reported() {
        let mut capture = MicrophoneCapture::new(speech_source(), listener(), FailingTranscriber);

        let outcome = capture
            .capture_and_transcribe(Duration::from_secs(5), Duration::from_secs(10))
            .await;
        match outcome {
            CaptureOutcome::Failed(msg) => assert!(msg.contains("model crashed")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_transcription_is_no_speech() {
        let transcriber = MockTranscriptionService::with_text("   ");
        let mut capture = MicrophoneCapture::new(speech_source(), listener(), transcriber);

        let outcome = capture
            .capture_and_transcribe(Duration::from_secs(5), Duration::from_secs(10))
            .await;
        assert_eq!(outcome, CaptureOutcome::NoSpeech);
    }

    #[tokio::test]
    async fn test_scripted_capture_replays_and_records_bounds() {
        let mut capture = ScriptedCapture::new(vec![
            CaptureOutcome::Utterance("first".to_string()),
            CaptureOutcome::Failed("boom".to_string()),
        ]);
        let bounds = (Duration::from_secs(5), Duration::from_secs(10));

        assert_eq!(
            capture.capture_and_transcribe(bounds.0, bounds.1).await,
            CaptureOutcome::Utterance("first".to_string())
        );
        assert_eq!(
            capture.capture_and_transcribe(bounds.0, bounds.1).await,
            CaptureOutcome::Failed("boom".to_string())
        );
        assert_eq!(
            capture.capture_and_transcribe(bounds.0, bounds.1).await,
            CaptureOutcome::NoSpeech
        );
        assert_eq!(capture.calls(), &[bounds, bounds, bounds]);
    }
}
