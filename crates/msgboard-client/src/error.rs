//! Client error taxonomy. Every append or traversal failure names the
//! channel and/or record address it is about.

use msgboard_program::{
    instruction::BuildError, Address, AddressDerivationError, DecodeError, RejectReason,
    RejectionError,
};
use thiserror::Error;

use crate::{config::ConfigError, ledger::LedgerError};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("invalid channel name {name:?}")]
    InvalidName { name: String },

    #[error(transparent)]
    AddressDerivation(#[from] AddressDerivationError),

    #[error("record {address} failed to decode: {source}")]
    Decode {
        address: Address,
        #[source]
        source: DecodeError,
    },

    #[error("no record at {address}")]
    MissingRecord { address: Address },

    #[error("address {address} is already in use")]
    AddressInUse { address: Address },

    #[error("channel {channel}: record {address} revisited after {steps} steps")]
    CycleDetected { channel: Address, address: Address, steps: usize },

    #[error("channel {channel}: chain longer than {limit} records")]
    ChainTooLong { channel: Address, limit: usize },

    #[error("channel {channel}: message {address} has {found} of {expected} parts")]
    IncompleteMessage { channel: Address, address: Address, expected: u64, found: u64 },

    #[error("channel {channel}: message {address} is corrupt: {detail}")]
    CorruptMessage { channel: Address, address: Address, detail: String },

    #[error("transaction on {address} rejected: {source}")]
    Rejected {
        address: Address,
        #[source]
        source: RejectionError,
    },

    #[error("ledger unavailable while accessing {address}: {message}")]
    Unavailable { address: Address, message: String },

    #[error("append to channel {channel} lost the tail race {attempts} times")]
    AppendContended { channel: Address, attempts: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl BoardError {
    /// Maps a ledger failure about `address`; duplicate creation becomes AddressInUse.
    pub(crate) fn from_ledger(address: Address, err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(r) if r.is(RejectReason::AccountAlreadyInitialized) => {
                BoardError::AddressInUse { address: r.account }
            }
            LedgerError::Rejected(source) => BoardError::Rejected { address, source },
            LedgerError::Unavailable(message) => BoardError::Unavailable { address, message },
        }
    }

    /// Chain structure violations; never retried.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            BoardError::MissingRecord { .. }
                | BoardError::CycleDetected { .. }
                | BoardError::ChainTooLong { .. }
                | BoardError::IncompleteMessage { .. }
                | BoardError::CorruptMessage { .. }
                | BoardError::Decode { .. }
        )
    }
}
