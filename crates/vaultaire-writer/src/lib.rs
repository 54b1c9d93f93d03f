//! Vaultaire Write Pipeline
//!
//! This crate is the per-origin write path: it takes point bursts off the
//! broker, accumulates them into time-sharded buckets and flushes them to
//! the object pool as a two-phase write that links simple records to
//! their out-of-band extended payloads by byte offset.
//!
//! ## Architecture
//!
//! ```text
//! broker adapter
//!     │ Request { reply, origin, payload }
//!     ▼
//! ┌────────────┐   one channel per origin   ┌────────────┐
//! │ Dispatcher ├───────────────────────────▶│  Batcher   │◀── Tick (100ms)
//! └────────────┘                            │ BatchState │
//!                                           └─────┬──────┘
//!                                      batch period elapsed
//!                                                 ▼
//!                                          ┌─────────────┐
//!                                          │ flush_batch │── two-phase
//!                                          └─────────────┘   write + acks
//!                                                 │
//!                                                 ▼
//!                                            object pool
//! ```
//!
//! Every origin gets exactly one batcher task; batchers share nothing and
//! the dispatcher is the only router. The flush writer holds the origin's
//! exclusive pool lock for the whole write, acknowledges every message in
//! the batch only after both phases are durable, and rolls the origin's
//! day over when a bucket object outgrows its generation.
//!
//! ## Usage
//!
//! ```ignore
//! use vaultaire_writer::{Dispatcher, ReplyHandle, Request, WriterConfig};
//!
//! let dispatcher = Dispatcher::spawn(pool, WriterConfig::default());
//!
//! let (reply, rx) = ReplyHandle::pair();
//! dispatcher.send(Request { reply, origin, payload }).await?;
//! match rx.await? {
//!     Reply::Success => {}
//!     Reply::Failure(msg) => eprintln!("write refused: {msg}"),
//! }
//! ```

pub mod batch;
mod batcher;
pub mod config;
pub mod daymaps;
pub mod dispatcher;
pub mod error;
pub mod flush;
pub mod ingress;
pub mod internal;
pub mod reader;

pub use batch::BatchState;
pub use config::WriterConfig;
pub use daymaps::OriginDayMaps;
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use flush::{flush_batch, BUCKET_SIZE};
pub use ingress::{Reply, ReplyHandle, Request};
pub use internal::InternalStore;
