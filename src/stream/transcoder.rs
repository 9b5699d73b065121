use bytes::Bytes;
use memchr::memchr_iter;

use crate::protocol::decoder::{extract_delta, DeltaExtract};
use crate::protocol::encoder::{delta_frame, stop_frame};

/// Lifecycle of one transcoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscoderState {
    /// Input is still being consumed.
    Streaming,
    /// The stream closed cleanly, either via the `[DONE]` sentinel or end of input.
    Done,
    /// The upstream read failed mid-stream.
    Failed,
}

/// Incremental transcoder from the upstream pseudo-SSE byte stream to output
/// delta frames.
///
/// Bytes are fed in whatever chunk sizes the network delivers; the transcoder
/// scans complete lines and keeps the trailing partial line (including any
/// split multi-byte character) buffered until more input arrives. The output
/// for a given byte sequence does not depend on how it was chunked.
///
/// The `[DONE]` sentinel emits the synthetic stop frame and moves the
/// transcoder to [`TranscoderState::Done`]; any input after that is ignored.
pub struct DeltaTranscoder {
    buffer: Vec<u8>,
    state: TranscoderState,
    fragments_emitted: u64,
}

enum LineOutcome {
    Skipped,
    Emitted,
    Sentinel,
}

impl Default for DeltaTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaTranscoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: TranscoderState::Streaming,
            fragments_emitted: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> TranscoderState {
        self.state
    }

    /// Number of delta frames emitted so far (the stop frame not included).
    #[must_use]
    pub fn fragments_emitted(&self) -> u64 {
        self.fragments_emitted
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, TranscoderState::Streaming)
    }

    /// Feed one chunk of upstream bytes, appending output frames to `out`.
    ///
    /// Returns `true` when the sentinel terminated the stream during this call.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<Bytes>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.buffer.extend_from_slice(chunk);

        // The buffer never retains a completed line, so every newline found
        // here ends a line not yet processed.
        let mut consumed = 0usize;
        let mut saw_sentinel = false;
        for line_end in memchr_iter(b'\n', &self.buffer) {
            let line = &self.buffer[consumed..line_end];
            consumed = line_end + 1;
            match Self::transcode_line(line, out) {
                LineOutcome::Skipped => {}
                LineOutcome::Emitted => self.fragments_emitted += 1,
                LineOutcome::Sentinel => {
                    saw_sentinel = true;
                    break;
                }
            }
        }

        if saw_sentinel {
            self.state = TranscoderState::Done;
            self.buffer.clear();
            return true;
        }
        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
        false
    }

    /// Mark end of input. A stream that ends without the sentinel closes
    /// silently; any buffered partial line is discarded. Idempotent.
    pub fn finish(&mut self) {
        if self.state == TranscoderState::Streaming {
            if !self.buffer.is_empty() {
                tracing::debug!(
                    buffered = self.buffer.len(),
                    "discarding partial line at end of stream"
                );
            }
            self.state = TranscoderState::Done;
            self.buffer.clear();
        }
    }

    /// Mark the stream failed after an upstream read error. Idempotent.
    pub fn fail(&mut self) {
        if self.state == TranscoderState::Streaming {
            self.state = TranscoderState::Failed;
            self.buffer.clear();
        }
    }

    fn transcode_line(line: &[u8], out: &mut Vec<Bytes>) -> LineOutcome {
        let Ok(text) = std::str::from_utf8(line) else {
            tracing::debug!(len = line.len(), "skipping non-utf8 stream line");
            return LineOutcome::Skipped;
        };
        let trimmed = text.trim();
        let Some(payload) = trimmed.strip_prefix("data: ") else {
            return LineOutcome::Skipped;
        };
        if payload == "[DONE]" {
            out.push(stop_frame());
            return LineOutcome::Sentinel;
        }
        match extract_delta(payload) {
            DeltaExtract::Fragment(fragment) => {
                out.push(delta_frame(&fragment));
                LineOutcome::Emitted
            }
            DeltaExtract::NoContent => LineOutcome::Skipped,
            DeltaExtract::Malformed => {
                tracing::debug!(len = payload.len(), "skipping unparseable stream record");
                LineOutcome::Skipped
            }
        }
    }
}
