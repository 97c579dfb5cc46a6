//! Microphone capture via cpal.
//!
//! With the `microphone` feature, opens an input device and streams mono
//! samples at the configured rate. The cpal stream lives on a dedicated
//! thread because it is not `Send` on every platform; samples reach the
//! async side through an unbounded channel.
//!
//! Without the feature, [`MicrophoneSource::open`] returns `VoxQueryError::Audio`.

use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use voxquery_core::config::CaptureConfig;
use voxquery_core::error::VoxQueryError;

use crate::AudioSource;

/// Configuration for the microphone source.
#[derive(Debug, Clone)]
pub struct MicrophoneConfig {
    /// Name or substring of the input device. "default" selects the host's
    /// default input device.
    pub device_name: String,
    /// Output sample rate in Hz; device audio is resampled to it.
    pub sample_rate: u32,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            device_name: "default".to_string(),
            sample_rate: 16000,
        }
    }
}

impl From<&CaptureConfig> for MicrophoneConfig {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            device_name: "default".to_string(),
            sample_rate: config.sample_rate,
        }
    }
}

/// Average interleaved channels into one.
pub fn downmix_to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    let ch = channels as usize;
    data.chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Live microphone input.
///
/// Dropping the source stops the stream and joins the capture thread.
pub struct MicrophoneSource {
    config: MicrophoneConfig,
    receiver: mpsc::UnboundedReceiver<Vec<f32>>,
    pending: Vec<f32>,
    stop: Option<std_mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl MicrophoneSource {
    /// Open the configured input device and start streaming.
    pub fn open(config: MicrophoneConfig) -> Result<Self, VoxQueryError> {
        let (sample_tx, receiver) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), VoxQueryError>>();

        let thread_config = config.clone();
        let worker = std::thread::Builder::new()
            .name("voxquery-mic".to_string())
            .spawn(move || run_stream(thread_config, sample_tx, stop_rx, ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(VoxQueryError::Audio(
                    "Microphone thread exited before the stream started".to_string(),
                ));
            }
        }

        Ok(Self {
            config,
            receiver,
            pending: Vec::new(),
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    pub fn config(&self) -> &MicrophoneConfig {
        &self.config
    }
}

impl AudioSource for MicrophoneSource {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    async fn read_frame(&mut self, len: usize) -> Result<Option<Vec<f32>>, VoxQueryError> {
        while self.pending.len() < len {
            match self.receiver.recv().await {
                Some(chunk) => self.pending.extend_from_slice(&chunk),
                None if self.pending.is_empty() => return Ok(None),
                None => break,
            }
        }
        let take = len.min(self.pending.len());
        Ok(Some(self.pending.drain(..take).collect()))
    }

    fn discard_pending(&mut self) {
        self.pending.clear();
        while self.receiver.try_recv().is_ok() {}
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        // Closing the stop channel wakes the capture thread.
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        tracing::debug!("Microphone stream closed");
    }
}

// =============================================================================
// cpal stream (microphone feature)
// =============================================================================

#[cfg(feature = "microphone")]
fn run_stream(
    config: MicrophoneConfig,
    sample_tx: mpsc::UnboundedSender<Vec<f32>>,
    stop_rx: std_mpsc::Receiver<()>,
    ready_tx: std_mpsc::Sender<Result<(), VoxQueryError>>,
) {
    use cpal::traits::StreamTrait;

    let stream = match build_stream(&config, sample_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(VoxQueryError::Audio(format!(
            "Failed to start audio stream: {}",
            e
        ))));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    // Park until the source is dropped; the stream stops when it goes out of scope.
    let _ = stop_rx.recv();
}

#[cfg(feature = "microphone")]
fn build_stream(
    config: &MicrophoneConfig,
    sample_tx: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<cpal::Stream, VoxQueryError> {
    use cpal::traits::{DeviceTrait, HostTrait};
    use tracing::{debug, info};

    let host = cpal::default_host();

    let device = if config.device_name == "default" {
        host.default_input_device()
            .ok_or_else(|| VoxQueryError::Audio("No default input device found".into()))?
    } else {
        let name_lower = config.device_name.to_lowercase();
        host.input_devices()
            .map_err(|e| VoxQueryError::Audio(format!("Failed to enumerate devices: {}", e)))?
            .find(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&name_lower))
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                VoxQueryError::Audio(format!("Audio device '{}' not found", config.device_name))
            })?
    };

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    debug!(device = %device_name, "Selected audio device");

    // Use the device's preferred config; many devices reject arbitrary rates.
    let supported = device
        .default_input_config()
        .map_err(|e| VoxQueryError::Audio(format!("No usable input config: {}", e)))?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();

    let device_rate = stream_config.sample_rate.0;
    let device_channels = stream_config.channels;
    let target_rate = config.sample_rate;
    info!(
        device = %device_name,
        device_rate,
        device_channels,
        target_rate,
        format = ?sample_format,
        "Microphone opened"
    );

    let convert = move |data: &[f32]| {
        let mono = downmix_to_mono(data, device_channels);
        voxquery_whisper::resample_linear(&mono, device_rate, target_rate)
    };
    let on_error = |err: cpal::StreamError| {
        tracing::error!("Audio stream error: {}", err);
    };

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = sample_tx.send(convert(data));
            },
            on_error,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let floats: Vec<f32> = data.iter().map(|s| *s as f32 / i16::MAX as f32).collect();
                let _ = sample_tx.send(convert(&floats));
            },
            on_error,
            None,
        ),
        other => {
            return Err(VoxQueryError::Audio(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| VoxQueryError::Audio(format!("Failed to build audio stream: {}", e)))?;

    Ok(stream)
}

#[cfg(not(feature = "microphone"))]
fn run_stream(
    _config: MicrophoneConfig,
    _sample_tx: mpsc::UnboundedSender<Vec<f32>>,
    _stop_rx: std_mpsc::Receiver<()>,
    ready_tx: std_mpsc::Sender<Result<(), VoxQueryError>>,
) {
    tracing::warn!("MicrophoneSource opened without the `microphone` feature");
    let _ = ready_tx.send(Err(VoxQueryError::Audio(
        "Microphone capture requires the `microphone` feature to be enabled".into(),
    )));
}
