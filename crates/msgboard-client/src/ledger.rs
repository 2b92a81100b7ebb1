//! Ledger collaborator interface and an in-memory ledger.
//!
//! Ledger: submit a transaction (all instructions apply or none do) and read
//! raw record bytes. Each call is one suspension point.
//! LocalLedger: runs the program processor over a HashMap, staging every
//! transaction on a copy of the accounts and committing only on success.

use std::collections::HashMap;

use anchor_lang::solana_program::{instruction::Instruction, pubkey::Pubkey};
use msgboard_program::{processor::process_instruction, Address, RejectionError};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transaction rejected: {0}")]
    Rejected(#[from] RejectionError),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[allow(async_fn_in_trait)]
pub trait Ledger {
    /// Applies all `instructions` atomically, signed by `signers`.
    async fn submit_transaction(
        &self,
        instructions: &[Instruction],
        signers: &[Address],
    ) -> Result<(), LedgerError>;

    /// Raw bytes stored at `address`, or None if no record exists there.
    async fn get_record(&self, address: &Address) -> Result<Option<Vec<u8>>, LedgerError>;
}

impl<L: Ledger + ?Sized> Ledger for &L {
    async fn submit_transaction(
        &self,
        instructions: &[Instruction],
        signers: &[Address],
    ) -> Result<(), LedgerError> {
        (**self).submit_transaction(instructions, signers).await
    }

    async fn get_record(&self, address: &Address) -> Result<Option<Vec<u8>>, LedgerError> {
        (**self).get_record(address).await
    }
}

/// A signing credential; only its public address matters to the client.
pub trait Credential {
    fn address(&self) -> Address;
}

impl Credential for Address {
    fn address(&self) -> Address {
        *self
    }
}

#[derive(Default)]
struct Accounts {
    data: HashMap<Address, Vec<u8>>,
    transactions: usize,
}

pub struct LocalLedger {
    program_id: Pubkey,
    accounts: Mutex<Accounts>,
}

impl LocalLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id, accounts: Mutex::new(Accounts::default()) }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Writes bytes directly, bypassing the processor.
    pub fn put_raw(&self, address: Address, data: Vec<u8>) {
        self.accounts.lock().data.insert(address, data);
    }

    /// Deletes a record directly, bypassing the processor.
    pub fn remove(&self, address: &Address) -> Option<Vec<u8>> {
        self.accounts.lock().data.remove(address)
    }

    pub fn record_count(&self) -> usize {
        self.accounts.lock().data.len()
    }

    /// Committed transactions so far.
    pub fn transaction_count(&self) -> usize {
        self.accounts.lock().transactions
    }
}

impl Ledger for LocalLedger {
    async fn submit_transaction(
        &self,
        instructions: &[Instruction],
        signers: &[Address],
    ) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.lock();
        let mut staged = accounts.data.clone();
        for ix in instructions {
            process_instruction(&self.program_id, &mut staged, ix, signers)?;
        }
        accounts.data = staged;
        accounts.transactions += 1;
        debug!(instructions = instructions.len(), "transaction committed");
        Ok(())
    }

    async fn get_record(&self, address: &Address) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.accounts.lock().data.get(address).cloned())
    }
}
