//! # Module overview
//! Ledger-side contract of the message board. Both the client and the
//! executing program link this crate, so the byte layout lives in one place.
//!
//! 1. state / codec: ChannelRecord and MessageRecord layouts, schema tables,
//!    deterministic encode and strict decode.
//! 2. address: program-derived addresses for channels and message chunks.
//! 3. instruction: borsh instruction envelope plus builders.
//! 4. processor: executes instructions against an account store, rejecting
//!    anything that would break the chain invariants.
//!
//! # Record chain
//! A channel record points at its newest message (`tail`); every message
//! record points at the next older one (`next`). The all-zero address ends
//! the chain. An over-size message is a run of chunk records, head chunk
//! first, each carrying the total `size` and `parts`.

#![allow(unexpected_cfgs)] // Keep until Anchor's cfg layout is simplified

use anchor_lang::prelude::*;

pub mod address;
pub mod codec;
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

// Program ID
declare_id!("5R8FW6sNQaXA7HZhYkSXZLoroC4FcfkvdxZ1TyUVJxJY");

// Re-exports
pub use address ::{ Address, SENTINEL };
pub use codec   ::{ DecodeError, Record };
pub use error   ::{ AddressDerivationError, RejectReason, RejectionError };
pub use state   ::{ ChannelRecord, MessageRecord, Payload };
