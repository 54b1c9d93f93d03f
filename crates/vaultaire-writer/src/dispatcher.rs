//! Dispatcher
//!
//! The single routing actor for a writer process. It owns the only
//! mutable map in the system — `origin -> batcher input channel` — and
//! serializes every routing decision by being one task.
//!
//! Routing a message:
//!
//! 1. An existing channel gets the message. A failed send means the
//!    batcher sealed itself or died; the stale entry is dropped and the
//!    message falls through to
//! 2. spawn: a fresh batcher (and its tick generator) is started and the
//!    message is the first thing it receives. A fresh channel refusing
//!    its first message means the routing table and the batcher set have
//!    come apart, which is not survivable: the process aborts rather than
//!    silently dropping an accepted message.
//!
//! Dropping the [`Dispatcher`] (and any cloned senders) shuts the writer
//! down from the outside in: the routing task exits, batcher channels go
//! quiet, and each batcher flushes its open batch and seals itself after
//! an idle period.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};
use vaultaire_core::Origin;
use vaultaire_pool::Pool;

use crate::batcher;
use crate::config::WriterConfig;
use crate::error::{Error, Result};
use crate::ingress::{Event, Msg, Request};

const INGRESS_QUEUE_DEPTH: usize = 64;

/// Handle for feeding requests into a running writer.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Request>,
}

impl Dispatcher {
    /// Start the routing actor over the given pool.
    pub fn spawn(pool: Arc<dyn Pool>, config: WriterConfig) -> Dispatcher {
        let (tx, rx) = mpsc::channel(INGRESS_QUEUE_DEPTH);
        tokio::spawn(run(rx, pool, config));
        Dispatcher { tx }
    }

    /// Route one ingress request to its origin's batcher.
    pub async fn send(&self, request: Request) -> Result<()> {
        self.tx.send(request).await.map_err(|_| Error::Shutdown)
    }
}

async fn run(mut rx: mpsc::Receiver<Request>, pool: Arc<dyn Pool>, config: WriterConfig) {
    let mut batchers: HashMap<Origin, mpsc::Sender<Event>> = HashMap::new();
    info!("dispatcher started");

    while let Some(request) = rx.recv().await {
        let Request {
            reply,
            origin,
            payload,
        } = request;
        let mut msg = Msg { reply, payload };

        if let Some(batcher_tx) = batchers.get(&origin) {
            match batcher_tx.send(Event::Msg(msg)).await {
                Ok(()) => continue,
                Err(mpsc::error::SendError(event)) => {
                    // sealed or dead; forget it and spawn fresh
                    debug!(origin = %origin, "dropping stale batcher entry");
                    batchers.remove(&origin);
                    let Event::Msg(returned) = event else {
                        // we only ever send messages from here
                        continue;
                    };
                    msg = returned;
                }
            }
        }

        debug!(origin = %origin, "spawning batcher");
        let batcher_tx = batcher::spawn(origin.clone(), Arc::clone(&pool), config.clone());
        if batcher_tx.send(Event::Msg(msg)).await.is_err() {
            // a freshly spawned batcher cannot have sealed; the routing
            // state is corrupt beyond recovery
            error!(origin = %origin, "fresh batcher refused its first message");
            std::process::abort();
        }
        batchers.insert(origin, batcher_tx);
    }

    info!("dispatcher stopped");
}
