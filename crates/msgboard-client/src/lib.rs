//! Client core for the ledger message board.
//!
//! Derives record addresses, builds records, submits instructions and walks
//! channel chains. Holds no mutable state of its own: the ledger is the only
//! store, and the program processor is the only writer.
//!
//! ensure_channel: idempotent channel creation.
//! append_message: chunked append; head chunk + tail update land atomically.
//! list_messages: lazy, restartable, cycle-guarded walk from the tail.
//!
//! Known leak: non-head chunks are separate transactions. An append abandoned
//! (or retried after losing the tail race) after some of them landed leaves
//! those records orphaned. They are unreachable from any tail and inert.

mod append;
mod channel;
mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod traverse;

pub use append::plan_chunks;
pub use client::BoardClient;
pub use config::{BoardConfig, ConfigError};
pub use error::BoardError;
pub use ledger::{Credential, Ledger, LedgerError, LocalLedger};
pub use traverse::{Message, MessageStream};

pub use msgboard_program::{Address, ChannelRecord, MessageRecord, Payload, SENTINEL};
