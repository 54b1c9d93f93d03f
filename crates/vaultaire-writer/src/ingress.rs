//! Writer Ingress Types
//!
//! The broker transport is out of process; what reaches the writer is a
//! stream of [`Request`]s, each carrying the origin, the raw point burst
//! and a one-shot handle the pipeline answers exactly once — `Success`
//! after the burst's batch is durably flushed, or `Failure` as soon as
//! the message is known to be unprocessable.
//!
//! Dropping a [`ReplyHandle`] without answering is deliberate silence:
//! the client's broker timeout fires and the message is retried.

use bytes::Bytes;
use tokio::sync::oneshot;
use vaultaire_core::Origin;

/// Outcome delivered back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success,
    Failure(String),
}

/// One-shot reply channel for a single ingress message.
#[derive(Debug)]
pub struct ReplyHandle {
    tx: oneshot::Sender<Reply>,
}

impl ReplyHandle {
    /// A connected handle/receiver pair. Broker adapters hold the
    /// receiver; the writer answers through the handle.
    pub fn pair() -> (ReplyHandle, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        (ReplyHandle { tx }, rx)
    }

    /// Answer the message. A gone client is not an error.
    pub fn ack(self, reply: Reply) {
        let _ = self.tx.send(reply);
    }
}

/// One ingress frame: who it is from, what to write, where to answer.
#[derive(Debug)]
pub struct Request {
    pub reply: ReplyHandle,
    pub origin: Origin,
    pub payload: Bytes,
}

/// What a batcher receives on its input channel: ingress messages
/// multiplexed with timer ticks from its tick generator.
#[derive(Debug)]
pub(crate) enum Event {
    Msg(Msg),
    Tick,
}

/// An ingress message after the dispatcher has routed it; the origin is
/// implied by which batcher's channel it is on.
#[derive(Debug)]
pub(crate) struct Msg {
    pub reply: ReplyHandle,
    pub payload: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ack_delivers_reply() {
        let (handle, rx) = ReplyHandle::pair();
        handle.ack(Reply::Success);
        assert_eq!(rx.await.unwrap(), Reply::Success);
    }

    #[tokio::test]
    async fn test_dropped_handle_closes_receiver() {
        let (handle, rx) = ReplyHandle::pair();
        drop(handle);
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_ack_to_gone_client_is_silent() {
        let (handle, rx) = ReplyHandle::pair();
        drop(rx);
        handle.ack(Reply::Failure("nobody listening".to_string()));
    }
}
