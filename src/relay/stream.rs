//! Streamed body relay.
//!
//! # Responsibilities
//! - Forward the target body to the caller as it arrives, never buffering it
//! - Split upstream frames into chunks of at most `chunk_size` bytes
//! - Optionally end the stream when the target stalls between chunks
//! - Own the upstream body so dropping the stream releases the connection
//!
//! # Design Decisions
//! - A chunk is emitted as soon as any bytes are available; the stream never
//!   waits to fill a whole `chunk_size`
//! - Status and headers are already on the wire when the body starts, so a
//!   mid-stream failure can only terminate the connection early

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Bytes;
use axum::BoxError;
use futures_util::Stream;
use thiserror::Error;
use tokio::time::{Instant, Sleep};

/// The target sent nothing for longer than the configured stall timeout.
#[derive(Debug, Error)]
#[error("upstream body stalled for more than {0:?}")]
pub struct StreamStalled(pub Duration);

struct StallTimer {
    limit: Duration,
    sleep: Pin<Box<Sleep>>,
}

impl StallTimer {
    fn new(limit: Duration) -> Self {
        Self {
            limit,
            sleep: Box::pin(tokio::time::sleep(limit)),
        }
    }

    fn reset(&mut self) {
        self.sleep.as_mut().reset(Instant::now() + self.limit);
    }
}

/// Body stream relaying a target response to the caller.
pub struct RelayStream<S> {
    upstream: Pin<Box<S>>,
    pending: Bytes,
    chunk_size: usize,
    stall: Option<StallTimer>,
    target: String,
    relayed: u64,
    finished: bool,
    completed: bool,
}

impl<S> RelayStream<S> {
    pub fn new(upstream: S, chunk_size: usize, stall_timeout: Option<Duration>, target: String) -> Self {
        Self {
            upstream: Box::pin(upstream),
            pending: Bytes::new(),
            chunk_size: chunk_size.max(1),
            stall: stall_timeout.map(StallTimer::new),
            target,
            relayed: 0,
            finished: false,
            completed: false,
        }
    }

    /// Bytes handed to the caller so far.
    pub fn relayed(&self) -> u64 {
        self.relayed
    }

    fn next_chunk(&mut self) -> Bytes {
        let len = self.chunk_size.min(self.pending.len());
        let chunk = self.pending.split_to(len);
        self.relayed += chunk.len() as u64;
        chunk
    }
}

impl<S, E> Stream for RelayStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    type Item = Result<Bytes, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if !this.pending.is_empty() {
            return Poll::Ready(Some(Ok(this.next_chunk())));
        }
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            match this.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    if let Some(stall) = this.stall.as_mut() {
                        stall.reset();
                    }
                    if bytes.is_empty() {
                        continue;
                    }
                    this.pending = bytes;
                    return Poll::Ready(Some(Ok(this.next_chunk())));
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    let err = err.into();
                    tracing::warn!(
                        target_url = %this.target,
                        relayed_bytes = this.relayed,
                        error = %err,
                        "Upstream body failed mid-stream"
                    );
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    this.completed = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    if let Some(stall) = this.stall.as_mut() {
                        if stall.sleep.as_mut().poll(cx).is_ready() {
                            this.finished = true;
                            tracing::warn!(
                                target_url = %this.target,
                                relayed_bytes = this.relayed,
                                limit = ?stall.limit,
                                "Upstream body stalled"
                            );
                            return Poll::Ready(Some(Err(StreamStalled(stall.limit).into())));
                        }
                    }
                    return Poll::Pending;
                }
            }
        }
    }
}

impl<S> Drop for RelayStream<S> {
    fn drop(&mut self) {
        if self.completed {
            tracing::debug!(
                target_url = %self.target,
                relayed_bytes = self.relayed,
                "Upstream body relayed"
            );
        } else {
            tracing::debug!(
                target_url = %self.target,
                relayed_bytes = self.relayed,
                "Upstream body abandoned before completion"
            );
        }
    }
}
