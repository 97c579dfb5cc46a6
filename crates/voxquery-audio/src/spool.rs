//! Temporary on-disk copy of a recorded utterance.
//!
//! The spool owns a `NamedTempFile`; the file is removed when the spool is
//! dropped, whichever way the turn ends.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use voxquery_core::error::VoxQueryError;

/// Raw little-endian f32 PCM written to a temporary file.
#[derive(Debug)]
pub struct RecordingSpool {
    file: NamedTempFile,
    sample_rate: u32,
    samples: usize,
}

impl RecordingSpool {
    /// Create an empty spool in the system temp directory.
    pub fn create(sample_rate: u32) -> Result<Self, VoxQueryError> {
        let file = tempfile::Builder::new()
            .prefix("voxquery-")
            .suffix(".pcm")
            .tempfile()?;
        tracing::trace!(path = %file.path().display(), "Recording spool created");
        Ok(Self {
            file,
            sample_rate,
            samples: 0,
        })
    }

    /// Append samples to the spool.
    pub fn write(&mut self, samples: &[f32]) -> Result<(), VoxQueryError> {
        let mut bytes = Vec::with_capacity(samples.len() * 4);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        let out = self.file.as_file_mut();
        out.write_all(&bytes)?;
        out.flush()?;
        self.samples += samples.len();
        Ok(())
    }

    /// Read every sample written so far.
    pub fn read_samples(&self) -> Result<Vec<f32>, VoxQueryError> {
        let bytes = std::fs::read(self.file.path())?;
        if bytes.len() % 4 != 0 {
            return Err(VoxQueryError::Audio(format!(
                "Recording spool is truncated: {} bytes",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// Duration of the spooled audio in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples as f32 / self.sample_rate as f32
    }
}
