//! Per-Origin Batcher Actor
//!
//! One batcher task owns everything for one origin: its day-map snapshot,
//! its open [`BatchState`] and its input channel. Nothing here is shared;
//! the dispatcher talks to the batcher only through the channel, which
//! carries ingress messages multiplexed with ticks from the batcher's own
//! tick generator task.
//!
//! ## Lifecycle
//!
//! - **Cold start**: the first message triggers a day-map load. While
//!   either lane's map is missing the origin does not exist, and every
//!   message is answered `Failure("No such origin")` without touching any
//!   state.
//! - **Accumulate**: each message's burst is decoded and resolved in
//!   full, then folded into the batch; a decode or resolution failure is
//!   answered immediately and leaves the batch untouched.
//! - **Flush**: a tick that finds the batch older than the configured
//!   period hands it to the flush writer. The day-map snapshot is dropped
//!   so the next batch re-reads it (a rollover may have landed).
//! - **Seal**: a full period with no open batch closes the input channel;
//!   whatever raced in is drained and flushed, then the task exits. The
//!   dispatcher notices the closed channel on the next message and
//!   respawns.
//!
//! A pool error is fatal to the batcher: the task dies with its batch
//! unacknowledged, clients retry through the broker, and the dispatcher
//! respawns a clean batcher on the next message.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};
use vaultaire_core::point::{decode_burst, PointPayload};
use vaultaire_core::Origin;
use vaultaire_pool::Pool;

use crate::batch::BatchState;
use crate::config::WriterConfig;
use crate::daymaps::{self, OriginDayMaps};
use crate::error::{Error, Result};
use crate::flush::flush_batch;
use crate::ingress::{Event, Msg, Reply};

/// Start a batcher and its tick generator for one origin, returning the
/// input channel.
pub(crate) fn spawn(
    origin: Origin,
    pool: Arc<dyn Pool>,
    config: WriterConfig,
) -> mpsc::Sender<Event> {
    let (tx, rx) = mpsc::channel(config.ingress_queue_depth.max(1));

    let tick_tx = tx.clone();
    let tick_interval = config.tick_interval();
    tokio::spawn(async move {
        let mut ticker = time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if tick_tx.send(Event::Tick).await.is_err() {
                // batcher sealed or died; the generator goes with it
                break;
            }
        }
    });

    let batcher = Batcher {
        origin: origin.clone(),
        pool,
        config,
        day_maps: None,
        state: None,
        idle_since: Instant::now(),
    };
    tokio::spawn(async move {
        if let Err(e) = batcher.run(rx).await {
            error!(origin = %origin, error = %e, "batcher died");
        }
    });

    tx
}

struct Batcher {
    origin: Origin,
    pool: Arc<dyn Pool>,
    config: WriterConfig,
    day_maps: Option<OriginDayMaps>,
    state: Option<BatchState>,
    idle_since: Instant,
}

impl Batcher {
    async fn run(mut self, mut rx: mpsc::Receiver<Event>) -> Result<()> {
        debug!(origin = %self.origin, "batcher started");

        while let Some(event) = rx.recv().await {
            match event {
                Event::Msg(msg) => {
                    self.idle_since = Instant::now();
                    self.handle_msg(msg).await?;
                }
                Event::Tick => {
                    if self.batch_due() {
                        self.flush().await?;
                    } else if self.state.is_none()
                        && self.idle_since.elapsed() >= self.config.batch_period()
                    {
                        self.seal(&mut rx).await?;
                        break;
                    }
                }
            }
        }

        // channel gone (sealed above, or the dispatcher shut down):
        // finish whatever is still open before exiting
        if let Some(state) = self.state.take() {
            flush_batch(self.pool.as_ref(), &self.origin, state, &self.config).await?;
        }
        info!(origin = %self.origin, "batcher stopped");
        Ok(())
    }

    /// Fold one ingress message into the batch, or answer it with a
    /// failure. Only pool trouble is an error here.
    async fn handle_msg(&mut self, msg: Msg) -> Result<()> {
        if self.day_maps.is_none() {
            match daymaps::load(self.pool.as_ref(), &self.origin).await {
                Ok(maps) => self.day_maps = maps,
                Err(Error::Codec(e)) => {
                    // a corrupt day map is the client's problem to report,
                    // not a reason to kill the batcher
                    msg.reply.ack(Reply::Failure(e.to_string()));
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
        let Some(maps) = &self.day_maps else {
            msg.reply.ack(Reply::Failure("No such origin".to_string()));
            return Ok(());
        };

        let points = match decode_burst(&msg.payload) {
            Ok(points) => points,
            Err(e) => {
                msg.reply.ack(Reply::Failure(e.to_string()));
                return Ok(());
            }
        };

        // Resolve every point before touching the batch, so a bad burst
        // leaves no partial state behind. Extended points resolve against
        // the simple day map too: both lanes of an address must land in
        // the same generation or the offset link between them breaks.
        let mut resolved = Vec::with_capacity(points.len());
        for point in &points {
            match maps.simple.lookup(point.time) {
                Some((epoch, no_buckets)) => {
                    resolved.push((epoch, point.address.bucket(no_buckets)))
                }
                None => {
                    let e = Error::DayMapUnresolved {
                        origin: self.origin.clone(),
                        time: point.time,
                    };
                    msg.reply.ack(Reply::Failure(e.to_string()));
                    return Ok(());
                }
            }
        }

        let state = self.state.get_or_insert_with(BatchState::new);
        state.push_reply(msg.reply);
        for (point, (epoch, bucket)) in points.iter().zip(resolved) {
            match &point.payload {
                PointPayload::Simple(value) => {
                    state.append_simple(epoch, bucket, point.address, point.time, *value)
                }
                PointPayload::Extended(blob) => {
                    state.append_extended(epoch, bucket, point.address, point.time, blob)
                }
            }
        }
        Ok(())
    }

    fn batch_due(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.age() >= self.config.batch_period())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(state) = self.state.take() {
            flush_batch(self.pool.as_ref(), &self.origin, state, &self.config).await?;
        }
        // next batch re-reads the day maps; a rollover may have landed
        self.day_maps = None;
        self.idle_since = Instant::now();
        Ok(())
    }

    /// Close the input channel and drain whatever the dispatcher managed
    /// to enqueue before noticing.
    async fn seal(&mut self, rx: &mut mpsc::Receiver<Event>) -> Result<()> {
        debug!(origin = %self.origin, "batcher idle, sealing input");
        rx.close();
        while let Some(event) = rx.recv().await {
            if let Event::Msg(msg) = event {
                self.handle_msg(msg).await?;
            }
        }
        Ok(())
    }
}
