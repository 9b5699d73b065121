use std::sync::Arc;

use axum::body::Body;
use futures_util::StreamExt;
use smallvec::SmallVec;

use crate::error::RelayError;
use crate::observability::{UsageEvent, UsageSink};
use crate::stream::transcoder::{DeltaTranscoder, TranscoderState};

struct PendingFrames {
    chunks: SmallVec<[bytes::Bytes; 8]>,
    head: usize,
}

impl PendingFrames {
    #[inline]
    fn with_capacity(capacity: usize) -> Self {
        let mut chunks = SmallVec::new();
        chunks.reserve(capacity);
        Self { chunks, head: 0 }
    }

    #[inline]
    fn pop_front(&mut self) -> Option<bytes::Bytes> {
        if self.head >= self.chunks.len() {
            return None;
        }
        let chunk = std::mem::take(&mut self.chunks[self.head]);
        self.head += 1;
        if self.head == self.chunks.len() {
            self.chunks.clear();
            self.head = 0;
        }
        Some(chunk)
    }

    #[inline]
    fn extend_from_frames(&mut self, frames: &mut Vec<bytes::Bytes>) {
        if frames.is_empty() {
            return;
        }
        self.chunks.reserve(frames.len());
        self.chunks.extend(frames.drain(..));
    }
}

/// Wrap an upstream byte stream into the transcoded response body.
///
/// The read loop is strictly sequential: one upstream chunk is pulled,
/// transcoded, and fully flushed before the next read, so output order
/// always matches upstream arrival order. Once the transcoder reaches a
/// terminal state the upstream stream is not polled again. Dropping the
/// body (client disconnect) cancels the loop at its await point.
///
/// A clean close reports [`UsageEvent::StreamCompleted`] to the sink exactly
/// once; a mid-stream read failure reports [`UsageEvent::RequestFailed`] and
/// surfaces the error through the body, which aborts the response.
pub fn transcoded_body<S, E>(byte_stream: S, usage_sink: Arc<dyn UsageSink>) -> Body
where
    S: futures_util::Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let output_stream = futures_util::stream::unfold(
        (
            Box::pin(byte_stream),
            DeltaTranscoder::new(),
            Vec::<bytes::Bytes>::with_capacity(8),
            PendingFrames::with_capacity(8),
            Some(usage_sink),
        ),
        |(mut byte_stream, mut transcoder, mut frames, mut pending, mut sink)| async move {
            loop {
                if let Some(chunk) = pending.pop_front() {
                    return Some((
                        Ok(chunk),
                        (byte_stream, transcoder, frames, pending, sink),
                    ));
                }
                if transcoder.is_terminal() {
                    if let Some(sink) = sink.take() {
                        if transcoder.state() == TranscoderState::Done {
                            sink.record(UsageEvent::StreamCompleted {
                                fragment_count: transcoder.fragments_emitted(),
                            });
                        }
                    }
                    return None;
                }
                match byte_stream.as_mut().next().await {
                    Some(Ok(chunk)) => {
                        transcoder.feed(&chunk, &mut frames);
                        pending.extend_from_frames(&mut frames);
                    }
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "upstream stream read failed");
                        transcoder.fail();
                        if let Some(sink) = sink.take() {
                            sink.record(UsageEvent::RequestFailed {
                                category: "transport",
                            });
                        }
                        let error =
                            RelayError::Transport(format!("Upstream stream read failed: {err}"));
                        return Some((
                            Err(error),
                            (byte_stream, transcoder, frames, pending, sink),
                        ));
                    }
                    None => transcoder.finish(),
                }
            }
        },
    );

    Body::from_stream(output_stream)
}
