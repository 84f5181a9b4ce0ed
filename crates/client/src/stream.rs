//! Cancellable result streams.
//!
//! One producer task per stream translates raw transport items and hands them to the consumer
//! through a channel with a single slot. Both hand-off points race the cancellation token.

use futures::Stream;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A single-pass, ordered stream of results.
///
/// Ends when the raw source is exhausted or the token is cancelled. Dropping the stream stops
/// the producer task.
#[derive(Debug)]
pub struct ResultStream<T> {
    rx: mpsc::Receiver<T>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> ResultStream<T> {
    /// Spawn a producer that maps every raw item through `translate`, in order.
    pub fn spawn<R, F>(cancel: CancellationToken, mut raw: mpsc::Receiver<R>, translate: F) -> Self
    where
        R: Send + 'static,
        F: Fn(R) -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let token = cancel.clone();

        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tx.closed() => break,
                    item = raw.recv() => match item {
                        Some(item) => item,
                        None => break,
                    },
                };

                let translated = translate(item);
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    sent = tx.send(translated) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(target: "dr::client", cancelled = token.is_cancelled(), "result producer finished");
        });

        Self { rx, cancel }
    }
}

impl<T> ResultStream<T> {
    /// Cancel the stream. No further items are yielded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Receive the next item.
    pub async fn recv(&mut self) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = self.rx.recv() => item,
        }
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}
