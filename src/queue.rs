//! Inbound message queue.
//!
//! Bridges chunks read off the wire by the receive loop to the consumer
//! task. Unbounded, FIFO, single producer, single consumer. End of stream
//! is `None` from [`InboundQueue::pop`]: once the transport is closed or
//! failed the producer is dropped, pending `pop()` calls wake with `None`
//! after any buffered chunks drain, and no consumer blocks forever on a
//! peer that disappeared.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use tokio::sync::mpsc;

/// Consumer side of the inbound queue.
#[derive(Debug)]
pub struct InboundQueue {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

/// Producer side, held by the receive loop.
#[derive(Debug, Clone)]
pub(crate) struct InboundSender {
    tx: mpsc::UnboundedSender<Bytes>,
}

pub(crate) fn channel() -> (InboundSender, InboundQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboundSender { tx }, InboundQueue { rx })
}

impl InboundSender {
    /// Append a chunk. Returns false once the consumer is gone.
    pub(crate) fn push(&self, chunk: Bytes) -> bool {
        self.tx.send(chunk).is_ok()
    }
}

impl InboundQueue {
    /// Wait for the next chunk. `None` means end of stream: the transport
    /// reached Closed or Failed and everything buffered has been consumed.
    pub async fn pop(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Detach the producer. Buffered chunks still drain through
    /// [`pop`](Self::pop) before it starts returning `None`.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for InboundQueue {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn chunks_come_out_in_push_order() {
        let (tx, mut queue) = channel();
        assert!(tx.push(Bytes::from_static(b"first")));
        assert!(tx.push(Bytes::from_static(b"second")));
        assert!(tx.push(Bytes::from_static(b"third")));

        assert_eq!(queue.pop().await.unwrap(), "first");
        assert_eq!(queue.pop().await.unwrap(), "second");
        assert_eq!(queue.pop().await.unwrap(), "third");
    }

    #[tokio::test]
    async fn producer_drop_ends_the_stream_after_draining() {
        let (tx, mut queue) = channel();
        tx.push(Bytes::from_static(b"last"));
        drop(tx);

        assert_eq!(queue.pop().await.unwrap(), "last");
        assert_eq!(queue.pop().await, None);
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn pending_pop_wakes_on_producer_drop() {
        let (tx, mut queue) = channel();
        let waiter = tokio::spawn(async move { queue.pop().await });
        tokio::task::yield_now().await;
        drop(tx);

        let popped = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("pop did not unblock")
            .unwrap();
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn close_rejects_new_pushes() {
        let (tx, mut queue) = channel();
        tx.push(Bytes::from_static(b"kept"));
        queue.close();
        assert!(!tx.push(Bytes::from_static(b"dropped")));

        assert_eq!(queue.pop().await.unwrap(), "kept");
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn push_fails_once_consumer_is_gone() {
        let (tx, queue) = channel();
        drop(queue);
        assert!(!tx.push(Bytes::from_static(b"nobody home")));
    }

    #[tokio::test]
    async fn stream_impl_yields_chunks() {
        use futures::StreamExt;

        let (tx, queue) = channel();
        tx.push(Bytes::from_static(b"a"));
        tx.push(Bytes::from_static(b"b"));
        drop(tx);

        let collected: Vec<_> = queue.collect().await;
        assert_eq!(collected, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
    }

    proptest! {
        #[test]
        fn arbitrary_chunk_sequences_preserve_order(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..32)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(async {
                let (tx, mut queue) = channel();
                for chunk in &chunks {
                    prop_assert!(tx.push(Bytes::copy_from_slice(chunk)));
                }
                drop(tx);
                for chunk in &chunks {
                    prop_assert_eq!(queue.pop().await.unwrap(), chunk.as_slice());
                }
                prop_assert_eq!(queue.pop().await, None);
                Ok(())
            })?;
        }
    }
}
