//! Errors shared by both sides of the contract.
//!
//! AddressDerivationError: seed lists the derivation function cannot hash.
//! RejectionError: the processor refused an instruction; nothing was written.

use std::fmt;

use thiserror::Error;

use crate::address::Address;

/// Seed list could not be turned into a program-derived address.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AddressDerivationError {
    #[error("too many seeds: {count} (max {max})")]
    TooManySeeds { count: usize, max: usize },

    #[error("seed {index} is {len} bytes (max {max})")]
    SeedTooLong { index: usize, len: usize, max: usize },

    #[error("no viable bump seed for the given seeds")]
    NoViableBump,
}

/// Why the processor refused an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    AccountAlreadyInitialized,
    AccountNotFound,
    InvalidAccountData,
    InvalidInstruction,
    InvalidSeeds,
    MissingRequiredSignature,
    RecordTooLarge,
    TailMoved,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::AccountAlreadyInitialized => "account already initialized",
            RejectReason::AccountNotFound           => "account not found",
            RejectReason::InvalidAccountData        => "invalid account data",
            RejectReason::InvalidInstruction        => "invalid instruction",
            RejectReason::InvalidSeeds              => "invalid seeds",
            RejectReason::MissingRequiredSignature  => "missing required signature",
            RejectReason::RecordTooLarge            => "record too large",
            RejectReason::TailMoved                 => "channel tail moved",
        };
        f.write_str(s)
    }
}

/// An instruction refused by the processor, with the account it was about.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason} (account {account})")]
pub struct RejectionError {
    pub reason : RejectReason,
    pub account: Address,
}

impl RejectionError {
    pub fn new(reason: RejectReason, account: Address) -> Self {
        Self { reason, account }
    }

    pub fn is(&self, reason: RejectReason) -> bool {
        self.reason == reason
    }
}
