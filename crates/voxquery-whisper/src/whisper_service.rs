//! Whisper transcription via whisper-rs (whisper.cpp bindings).
//!
//! With the `whisper` feature the GGML model is loaded once and each
//! utterance is decoded on a blocking thread. Without it the service still
//! constructs, and every call reports a transcription failure so the session
//! can move on to the continue prompt.

use voxquery_core::error::VoxQueryError;

use crate::{TranscriptionResult, TranscriptionService, WhisperConfig};

/// Sample rate whisper.cpp decodes at.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Language hint passed to the decoder. `None` asks Whisper to detect it.
pub(crate) fn language_hint(language: &str) -> Option<&str> {
    match language.trim() {
        "" | "auto" => None,
        code => Some(code),
    }
}

pub(crate) fn check_input(audio_data: &[f32], sample_rate: u32) -> Result<(), VoxQueryError> {
    if audio_data.is_empty() {
        return Err(VoxQueryError::Transcription(
            "no audio captured for transcription".into(),
        ));
    }
    if sample_rate == 0 {
        return Err(VoxQueryError::Transcription(
            "audio sample rate is zero".into(),
        ));
    }
    Ok(())
}

/// Resample mono audio by linear interpolation.
///
/// The output holds `ceil(len * to_rate / from_rate)` samples. Equal rates,
/// empty input and a zero rate return the input unchanged.
pub fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() || from_rate == 0 || to_rate == 0 {
        return input.to_vec();
    }
    let step = f64::from(from_rate) / f64::from(to_rate);
    let out_len = (input.len() as f64 / step).ceil() as usize;
    let last = input.len() - 1;

    (0..out_len)
        .map(|n| {
            let pos = n as f64 * step;
            let lo = (pos as usize).min(last);
            let hi = (lo + 1).min(last);
            let t = (pos - lo as f64) as f32;
            input[lo] + (input[hi] - input[lo]) * t
        })
        .collect()
}

/// Whisper transcription service backed by whisper.cpp.
pub struct WhisperService {
    #[cfg(feature = "whisper")]
    ctx: std::sync::Arc<whisper_rs::WhisperContext>,
    config: WhisperConfig,
}

impl WhisperService {
    /// Load the GGML model named in `config`.
    ///
    /// # Errors
    /// `VoxQueryError::Transcription` when no path is configured, the file is
    /// missing, or whisper.cpp rejects it.
    #[cfg(feature = "whisper")]
    pub fn new(config: WhisperConfig) -> Result<Self, VoxQueryError> {
        use whisper_rs::{WhisperContext, WhisperContextParameters};

        if config.model_path.is_empty() {
            return Err(VoxQueryError::Transcription(
                "no Whisper model configured (set whisper.model_path or --whisper-model)".into(),
            ));
        }
        if !std::path::Path::new(&config.model_path).is_file() {
            return Err(VoxQueryError::Transcription(format!(
                "Whisper model not found at {}",
                config.model_path
            )));
        }

        tracing::info!(model = %config.model_path, language = %config.language, "Loading Whisper model");
        let ctx = WhisperContext::new_with_params(
            &config.model_path,
            WhisperContextParameters::default(),
        )
        .map_err(|e| VoxQueryError::Transcription(format!("cannot load Whisper model: {e}")))?;
        tracing::info!(model = %config.model_path, "Whisper model loaded");

        Ok(Self {
            ctx: std::sync::Arc::new(ctx),
            config,
        })
    }

    #[cfg(not(feature = "whisper"))]
    pub fn new(config: WhisperConfig) -> Result<Self, VoxQueryError> {
        tracing::warn!("built without the `whisper` feature; spoken requests cannot be transcribed");
        Ok(Self { config })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
fn decode(
    ctx: &whisper_rs::WhisperContext,
    samples: &[f32],
    language: Option<&str>,
) -> Result<Vec<crate::Segment>, VoxQueryError> {
    use whisper_rs::{FullParams, SamplingStrategy};

    let fail = |what: &str, e: whisper_rs::WhisperError| {
        VoxQueryError::Transcription(format!("{what}: {e}"))
    };

    let mut state = ctx
        .create_state()
        .map_err(|e| fail("cannot create decoder state", e))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(language);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_suppress_blank(true);

    state
        .full(params, samples)
        .map_err(|e| fail("Whisper inference failed", e))?;

    let count = state
        .full_n_segments()
        .map_err(|e| fail("cannot read segment count", e))?;

    (0..count)
        .map(|i| {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| fail("cannot read segment text", e))?;
            // Segment timestamps are in centiseconds.
            let t0 = state
                .full_get_segment_t0(i)
                .map_err(|e| fail("cannot read segment start", e))?;
            let t1 = state
                .full_get_segment_t1(i)
                .map_err(|e| fail("cannot read segment end", e))?;
            Ok(crate::Segment {
                start: t0 as f32 / 100.0,
                end: t1 as f32 / 100.0,
                text: text.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(feature = "whisper")]
impl TranscriptionService for WhisperService {
    async fn transcribe(
        &self,
        audio_data: &[f32],
        sample_rate: u32,
    ) -> Result<TranscriptionResult, VoxQueryError> {
        check_input(audio_data, sample_rate)?;

        let samples = resample_linear(audio_data, sample_rate, WHISPER_SAMPLE_RATE);
        let duration_secs = samples.len() as f32 / WHISPER_SAMPLE_RATE as f32;
        let language = language_hint(&self.config.language).map(str::to_owned);
        let ctx = std::sync::Arc::clone(&self.ctx);

        tracing::debug!(samples = samples.len(), duration_secs, "Transcribing utterance");

        let hint = language.clone();
        let segments = tokio::task::spawn_blocking(move || decode(&ctx, &samples, hint.as_deref()))
            .await
            .map_err(|e| VoxQueryError::Transcription(format!("transcription task failed: {e}")))??;

        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        tracing::info!(segments = segments.len(), chars = text.len(), "Transcription complete");

        Ok(TranscriptionResult {
            text,
            segments,
            language: language.unwrap_or_else(|| "auto".to_string()),
            duration_secs,
        })
    }
}

#[cfg(not(feature = "whisper"))]
impl TranscriptionService for WhisperService {
    async fn transcribe(
        &self,
        audio_data: &[f32],
        sample_rate: u32,
    ) -> Result<TranscriptionResult, VoxQueryError> {
        check_input(audio_data, sample_rate)?;
        Err(VoxQueryError::Transcription(
            "transcription needs a build with the `whisper` feature".into(),
        ))
    }
}
