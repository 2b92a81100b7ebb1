//! Shared fixtures: a local board plus ledger wrappers that misbehave on purpose.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use anchor_lang::solana_program::instruction::Instruction;
use msgboard_client::{
    Address, BoardClient, BoardConfig, ChannelRecord, Ledger, LedgerError, LocalLedger,
    MessageRecord,
};
use msgboard_program::{
    address::message_nonce,
    codec::Record,
    instruction::{post_message_instruction, BoardInstruction},
};

pub fn config() -> BoardConfig {
    BoardConfig::default()
}

pub fn board() -> BoardClient<LocalLedger> {
    board_with(config())
}

pub fn board_with(config: BoardConfig) -> BoardClient<LocalLedger> {
    let ledger = LocalLedger::new(config.program_id);
    BoardClient::new(ledger, config).unwrap()
}

/// Board with channel `general` already created.
pub async fn board_with_channel(config: BoardConfig) -> (BoardClient<LocalLedger>, Address) {
    let board = board_with(config);
    let channel = board.ensure_channel("general", &Address::new_unique()).await.unwrap();
    (board, channel)
}

pub async fn read_message(ledger: &LocalLedger, address: &Address) -> MessageRecord {
    let bytes = ledger.get_record(address).await.unwrap().unwrap();
    MessageRecord::decode(&bytes).unwrap()
}

/// Rewrites the stored message at `address`, bypassing the processor.
pub async fn rewrite_message(
    ledger: &LocalLedger,
    address: &Address,
    edit: impl FnOnce(&mut MessageRecord),
) {
    let mut record = read_message(ledger, address).await;
    edit(&mut record);
    ledger.put_raw(*address, record.encode().unwrap());
}

pub async fn channel_tail(ledger: &LocalLedger, channel: &Address) -> Address {
    let bytes = ledger.get_record(channel).await.unwrap().unwrap();
    ChannelRecord::decode(&bytes).unwrap().tail
}

/// Every read misses, as if the caller raced a concurrent creator.
pub struct StaleReads<L>(pub L);

impl<L: Ledger> Ledger for StaleReads<L> {
    async fn submit_transaction(
        &self,
        instructions: &[Instruction],
        signers: &[Address],
    ) -> Result<(), LedgerError> {
        self.0.submit_transaction(instructions, signers).await
    }

    async fn get_record(&self, _address: &Address) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(None)
    }
}

/// Lets a rival sender win the tail race before each of the next `rounds` posts.
pub struct Contended {
    pub inner: LocalLedger,
    pub rival: Address,
    rounds: AtomicUsize,
}

impl Contended {
    pub fn new(inner: LocalLedger, rounds: usize) -> Self {
        Self { inner, rival: Address::new_unique(), rounds: AtomicUsize::new(rounds) }
    }

    async fn post_rival(&self, channel: &Address) -> Result<(), LedgerError> {
        let bytes = self.inner.get_record(channel).await?.unwrap_or_default();
        let tail = ChannelRecord::decode(&bytes)
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?
            .tail;
        let record = MessageRecord::text(self.rival, tail, "rival");
        let nonce = message_nonce("rival", 1);
        let ix = post_message_instruction(self.inner.program_id(), channel, &tail, &nonce, &record)
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        self.inner.submit_transaction(&[ix], &[self.rival]).await
    }
}

impl Ledger for Contended {
    async fn submit_transaction(
        &self,
        instructions: &[Instruction],
        signers: &[Address],
    ) -> Result<(), LedgerError> {
        if is_post(instructions)
            && self
                .rounds
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            self.post_rival(&instructions[0].accounts[1].pubkey).await?;
        }
        self.inner.submit_transaction(instructions, signers).await
    }

    async fn get_record(&self, address: &Address) -> Result<Option<Vec<u8>>, LedgerError> {
        self.inner.get_record(address).await
    }
}

fn is_post(instructions: &[Instruction]) -> bool {
    instructions.first().is_some_and(|ix| {
        matches!(BoardInstruction::unpack(&ix.data), Ok(BoardInstruction::PostMessage { .. }))
    })
}

/// The next `drops` head posts time out; everything else goes through.
pub struct DroppedPosts {
    pub inner: LocalLedger,
    drops: AtomicUsize,
}

impl DroppedPosts {
    pub fn new(inner: LocalLedger, drops: usize) -> Self {
        Self { inner, drops: AtomicUsize::new(drops) }
    }
}

impl Ledger for DroppedPosts {
    async fn submit_transaction(
        &self,
        instructions: &[Instruction],
        signers: &[Address],
    ) -> Result<(), LedgerError> {
        if is_post(instructions)
            && self
                .drops
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(LedgerError::Unavailable("post timed out".into()));
        }
        self.inner.submit_transaction(instructions, signers).await
    }

    async fn get_record(&self, address: &Address) -> Result<Option<Vec<u8>>, LedgerError> {
        self.inner.get_record(address).await
    }
}

/// Reads always fail.
pub struct Offline;

impl Ledger for Offline {
    async fn submit_transaction(&self, _: &[Instruction], _: &[Address]) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable("offline".into()))
    }

    async fn get_record(&self, _: &Address) -> Result<Option<Vec<u8>>, LedgerError> {
        Err(LedgerError::Unavailable("offline".into()))
    }
}
