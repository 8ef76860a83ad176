use std::{
    pin::Pin,
    task::{Context, Poll},
};

use axum::body::Bytes;
use futures::Stream;
use tracing::debug;

type InnerStream<E> = Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>;

/// passes an upstream body through chunk by chunk
///
/// nothing is buffered here, the next chunk is only pulled when hyper asks for it. when the client
/// goes away hyper drops the body, which drops this and the upstream response with it
pub struct RelayStream<E> {
    inner: InnerStream<E>,
    target: String,
    relayed: u64,
    finished: bool,
}

impl<E> RelayStream<E> {
    pub fn new<S>(inner: S, target: String) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    {
        Self {
            inner: Box::pin(inner),
            target,
            relayed: 0,
            finished: false,
        }
    }

    pub fn bytes_relayed(&self) -> u64 {
        self.relayed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<E> Stream for RelayStream<E> {
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.as_mut().poll_next(cx);

        match &polled {
            Poll::Ready(Some(Ok(chunk))) => self.relayed += chunk.len() as u64,
            // an upstream error ends the body too, hyper aborts the response
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => self.finished = true,
            Poll::Pending => {}
        }

        polled
    }
}

impl<E> Drop for RelayStream<E> {
    fn drop(&mut self) {
        if self.finished {
            debug!("Relayed {} bytes from {}", self.relayed, self.target);
        } else {
            debug!(
                "Downstream closed after {} bytes, aborting upstream read of {}",
                self.relayed, self.target
            );
        }
    }
}
