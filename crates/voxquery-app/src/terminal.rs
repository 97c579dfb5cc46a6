//! Terminal implementations of the operator and of keyboard capture.
//!
//! Both read from one line stream. In `--typed` mode the utterance and the
//! continue answer come from the same stdin, so the stream is shared.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

use voxquery_audio::{CaptureOutcome, SpeechCapture};
use voxquery_session::{Notice, Operator, SessionError};

/// Prompt shown before reading a typed request.
pub const TYPED_PROMPT: &str = "Type your request: ";

/// A line reader that several consumers can take turns on.
///
/// Lines are decoded lossily, so bytes that are not UTF-8 arrive as
/// replacement characters instead of failing the read.
pub struct SharedLines<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for SharedLines<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedLines<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> SharedLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
        }
    }

    /// Next line without its terminator, or `None` at end of input.
    pub async fn next_line(&self) -> std::io::Result<Option<String>> {
        let mut buf = Vec::new();
        if self.inner.lock().await.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> std::io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}

// =============================================================================
// Operator
// =============================================================================

/// Prints notices and prompts, and reads answers from a shared line stream.
pub struct TerminalOperator<R, W> {
    lines: SharedLines<R>,
    out: W,
}

impl<R, W> TerminalOperator<R, W> {
    pub fn new(lines: SharedLines<R>, out: W) -> Self {
        Self { lines, out }
    }
}

impl<R, W> Operator for TerminalOperator<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn notify(&mut self, notice: &Notice) -> Result<(), SessionError> {
        write_flush(&mut self.out, &format!("{notice}\n")).await?;
        Ok(())
    }

    async fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>, SessionError> {
        write_flush(&mut self.out, prompt).await?;
        Ok(self.lines.next_line().await?)
    }
}

// =============================================================================
// Keyboard capture
// =============================================================================

/// Capture step that reads the utterance as a typed line.
///
/// The listen bounds do not apply: there is no speech onset to wait for.
/// A blank line or closed input counts as no input.
pub struct TypedCapture<R, W> {
    lines: SharedLines<R>,
    out: W,
}

impl<R, W> TypedCapture<R, W> {
    pub fn new(lines: SharedLines<R>, out: W) -> Self {
        Self { lines, out }
    }
}

impl<R, W> SpeechCapture for TypedCapture<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn capture_and_transcribe(
        &mut self,
        _listen_timeout: Duration,
        _max_duration: Duration,
    ) -> CaptureOutcome {
        if let Err(e) = write_flush(&mut self.out, TYPED_PROMPT).await {
            return CaptureOutcome::Failed(e.to_string());
        }
        match self.lines.next_line().await {
            Ok(Some(line)) if !line.trim().is_empty() => {
                CaptureOutcome::Utterance(line.trim().to_string())
            }
            Ok(_) => CaptureOutcome::NoSpeech,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read typed request");
                CaptureOutcome::Failed(e.to_string())
            }
        }
    }
}
