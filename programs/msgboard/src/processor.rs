//! Instruction processor: the only writer of channel and message records.
//!
//! handle_create_channel: at-most-once channel creation at the name-derived address.
//! handle_write_chunk: stores one non-head chunk; never touches the channel.
//! handle_post_message: stores the head chunk and advances the tail, only if
//! the tail still equals the anchor the client built against.
//!
//! Handlers validate first and write last, so a rejected instruction leaves
//! the store as it was.

use std::collections::HashMap;

use anchor_lang::solana_program::{instruction::Instruction, pubkey::Pubkey};
use tracing::debug;

use crate::{
    address::{self, Address},
    codec::Record,
    error::{RejectReason, RejectionError},
    instruction::BoardInstruction,
    state::{channel_name_is_valid, ChannelRecord, MessageRecord, CHANNEL_SPACE, MAX_RECORD_BYTES},
};

/// Account storage the processor reads and writes.
pub trait AccountStore {
    fn load(&self, address: &Address) -> Option<&[u8]>;

    fn store(&mut self, address: Address, data: Vec<u8>);

    fn contains(&self, address: &Address) -> bool {
        self.load(address).is_some()
    }
}

impl AccountStore for HashMap<Address, Vec<u8>> {
    fn load(&self, address: &Address) -> Option<&[u8]> {
        self.get(address).map(Vec::as_slice)
    }

    fn store(&mut self, address: Address, data: Vec<u8>) {
        self.insert(address, data);
    }
}

type ProcessResult = Result<(), RejectionError>;

fn require(cond: bool, reason: RejectReason, account: &Address) -> ProcessResult {
    if cond {
        Ok(())
    } else {
        Err(RejectionError::new(reason, *account))
    }
}

/// Runs one instruction. `signers` are the addresses that signed the transaction.
pub fn process_instruction<S: AccountStore>(
    program_id: &Pubkey,
    store: &mut S,
    ix: &Instruction,
    signers: &[Address],
) -> ProcessResult {
    require(ix.program_id == *program_id, RejectReason::InvalidInstruction, &ix.program_id)?;
    let instruction = BoardInstruction::unpack(&ix.data)
        .map_err(|_| RejectionError::new(RejectReason::InvalidInstruction, *program_id))?;
    require(ix.accounts.len() >= 2, RejectReason::InvalidInstruction, program_id)?;

    let keys: Vec<Address> = ix.accounts.iter().map(|m| m.pubkey).collect();
    let signer = &ix.accounts[0];
    require(
        signer.is_signer && signers.contains(&signer.pubkey),
        RejectReason::MissingRequiredSignature,
        &signer.pubkey,
    )?;

    match instruction {
        BoardInstruction::CreateChannel { record } => {
            debug!("Instruction: Create channel");
            handle_create_channel(program_id, store, &keys, &record)
        }
        BoardInstruction::WriteChunk { anchor, nonce, part, record } => {
            debug!(part, "Instruction: Write chunk");
            require(keys.len() == 3, RejectReason::InvalidInstruction, program_id)?;
            let seeds = MessageSeeds { anchor: Address::new_from_array(anchor), nonce };
            handle_write_chunk(program_id, store, &keys, &seeds, part, &record)
        }
        BoardInstruction::PostMessage { anchor, nonce, record } => {
            debug!("Instruction: Post message");
            require(keys.len() == 3, RejectReason::InvalidInstruction, program_id)?;
            let seeds = MessageSeeds { anchor: Address::new_from_array(anchor), nonce };
            handle_post_message(program_id, store, &keys, &seeds, &record)
        }
    }
}

/// Derivation seeds of one message, beyond sender, channel and part.
struct MessageSeeds {
    anchor: Address,
    nonce : [u8; 32],
}

fn handle_create_channel<S: AccountStore>(
    program_id: &Pubkey,
    store: &mut S,
    keys : &[Address],
    data : &[u8],
) -> ProcessResult {
    let channel_key = &keys[1];
    let record = ChannelRecord::decode(data)
        .map_err(|_| RejectionError::new(RejectReason::InvalidAccountData, *channel_key))?;
    require(channel_name_is_valid(&record.name), RejectReason::InvalidAccountData, channel_key)?;
    require(record.is_empty(), RejectReason::InvalidAccountData, channel_key)?;

    let expected = address::channel_address(program_id, &record.name)
        .map_err(|_| RejectionError::new(RejectReason::InvalidSeeds, *channel_key))?;
    require(expected == *channel_key, RejectReason::InvalidSeeds, channel_key)?;
    // Channel already exists
    require(!store.contains(channel_key), RejectReason::AccountAlreadyInitialized, channel_key)?;

    store.store(*channel_key, padded_channel(&record, channel_key)?);
    Ok(())
}

fn handle_write_chunk<S: AccountStore>(
    program_id: &Pubkey,
    store: &mut S,
    keys  : &[Address],
    seeds : &MessageSeeds,
    part  : u64,
    data  : &[u8],
) -> ProcessResult {
    let (sender, chunk_key, channel_key) = (&keys[0], &keys[1], &keys[2]);
    let record = decode_message(data, sender, chunk_key)?;
    require(part >= 1 && part < record.parts, RejectReason::InvalidInstruction, chunk_key)?;

    load_channel(store, channel_key)?;
    let expected = address::message_address(program_id, sender, channel_key, &seeds.anchor, &seeds.nonce, part)
        .map_err(|_| RejectionError::new(RejectReason::InvalidSeeds, *chunk_key))?;
    require(expected == *chunk_key, RejectReason::InvalidSeeds, chunk_key)?;
    require(!store.contains(chunk_key), RejectReason::AccountAlreadyInitialized, chunk_key)?;

    store.store(*chunk_key, data.to_vec());
    Ok(())
}

fn handle_post_message<S: AccountStore>(
    program_id: &Pubkey,
    store: &mut S,
    keys  : &[Address],
    seeds : &MessageSeeds,
    data  : &[u8],
) -> ProcessResult {
    let (sender, channel_key, head_key) = (&keys[0], &keys[1], &keys[2]);
    let record = decode_message(data, sender, head_key)?;

    let mut channel = load_channel(store, channel_key)?;
    require(channel.tail == seeds.anchor, RejectReason::TailMoved, channel_key)?;

    let expected = address::message_address(program_id, sender, channel_key, &seeds.anchor, &seeds.nonce, 0)
        .map_err(|_| RejectionError::new(RejectReason::InvalidSeeds, *head_key))?;
    require(expected == *head_key, RejectReason::InvalidSeeds, head_key)?;
    require(!store.contains(head_key), RejectReason::AccountAlreadyInitialized, head_key)?;

    if record.parts > 1 {
        // Older chunks must already be in place.
        require(store.contains(&record.next), RejectReason::AccountNotFound, &record.next)?;
    } else {
        require(record.next == seeds.anchor, RejectReason::InvalidAccountData, head_key)?;
    }

    channel.tail = *head_key;
    let channel_data = padded_channel(&channel, channel_key)?;
    store.store(*head_key, data.to_vec());
    store.store(*channel_key, channel_data);
    Ok(())
}

fn decode_message(data: &[u8], sender: &Address, key: &Address) -> Result<MessageRecord, RejectionError> {
    require(data.len() <= MAX_RECORD_BYTES, RejectReason::RecordTooLarge, key)?;
    let record = MessageRecord::decode(data)
        .map_err(|_| RejectionError::new(RejectReason::InvalidAccountData, *key))?;
    require(record.sender == *sender, RejectReason::InvalidAccountData, key)?;
    require(record.parts >= 1, RejectReason::InvalidAccountData, key)?;
    require(record.next != *key, RejectReason::InvalidAccountData, key)?;
    Ok(record)
}

fn load_channel<S: AccountStore>(store: &S, key: &Address) -> Result<ChannelRecord, RejectionError> {
    let data = store
        .load(key)
        .ok_or_else(|| RejectionError::new(RejectReason::AccountNotFound, *key))?;
    ChannelRecord::decode(data).map_err(|_| RejectionError::new(RejectReason::InvalidAccountData, *key))
}

fn padded_channel(record: &ChannelRecord, key: &Address) -> Result<Vec<u8>, RejectionError> {
    let mut data = record
        .encode()
        .map_err(|_| RejectionError::new(RejectReason::InvalidAccountData, *key))?;
    data.resize(CHANNEL_SPACE.max(data.len()), 0);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        instruction::{create_channel_instruction, post_message_instruction, write_chunk_instruction},
        SENTINEL,
    };

    const NONCE: [u8; 32] = [1; 32];

    fn setup(name: &str) -> (Pubkey, Address, Address, HashMap<Address, Vec<u8>>) {
        let program = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let mut store = HashMap::new();
        let ix = create_channel_instruction(&program, name, &payer).unwrap();
        process_instruction(&program, &mut store, &ix, &[payer]).unwrap();
        (program, payer, ix.accounts[1].pubkey, store)
    }

    #[test]
    fn channel_is_padded_to_capacity() {
        let (_, _, channel, store) = setup("general");
        let data = store.load(&channel).unwrap();
        assert_eq!(data.len(), CHANNEL_SPACE);
        assert_eq!(ChannelRecord::decode(data).unwrap(), ChannelRecord::new("general"));
    }

    #[test]
    fn second_create_is_rejected() {
        let (program, payer, channel, mut store) = setup("general");
        let ix = create_channel_instruction(&program, "general", &payer).unwrap();
        let err = process_instruction(&program, &mut store, &ix, &[payer]).unwrap_err();
        assert_eq!(err, RejectionError::new(RejectReason::AccountAlreadyInitialized, channel));
    }

    #[test]
    fn unsigned_instruction_is_rejected() {
        let program = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let mut store = HashMap::new();
        let ix = create_channel_instruction(&program, "general", &payer).unwrap();
        let err = process_instruction(&program, &mut store, &ix, &[]).unwrap_err();
        assert!(err.is(RejectReason::MissingRequiredSignature));
        assert!(store.is_empty());
    }

    #[test]
    fn invalid_name_is_rejected() {
        let program = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let mut store = HashMap::new();
        let ix = create_channel_instruction(&program, " padded", &payer).unwrap();
        let err = process_instruction(&program, &mut store, &ix, &[payer]).unwrap_err();
        assert!(err.is(RejectReason::InvalidAccountData));
    }

    #[test]
    fn post_advances_tail() {
        let (program, payer, channel, mut store) = setup("general");
        let record = MessageRecord::text(payer, SENTINEL, "hi");
        let ix = post_message_instruction(&program, &channel, &SENTINEL, &NONCE, &record).unwrap();
        process_instruction(&program, &mut store, &ix, &[payer]).unwrap();

        let head = ix.accounts[2].pubkey;
        let tail = ChannelRecord::decode(store.load(&channel).unwrap()).unwrap().tail;
        assert_eq!(tail, head);
        assert_eq!(MessageRecord::decode(store.load(&head).unwrap()).unwrap(), record);
    }

    #[test]
    fn stale_anchor_is_rejected() {
        let (program, payer, channel, mut store) = setup("general");
        let first = MessageRecord::text(payer, SENTINEL, "one");
        let ix = post_message_instruction(&program, &channel, &SENTINEL, &NONCE, &first).unwrap();
        process_instruction(&program, &mut store, &ix, &[payer]).unwrap();

        let other = Pubkey::new_unique();
        let late = MessageRecord::text(other, SENTINEL, "two");
        let ix = post_message_instruction(&program, &channel, &SENTINEL, &NONCE, &late).unwrap();
        let err = process_instruction(&program, &mut store, &ix, &[other]).unwrap_err();
        assert_eq!(err, RejectionError::new(RejectReason::TailMoved, channel));
    }

    #[test]
    fn head_requires_written_chunks() {
        let (program, payer, channel, mut store) = setup("general");
        let chunk1 = address::message_address(&program, &payer, &channel, &SENTINEL, &NONCE, 1).unwrap();
        let head = MessageRecord { next: chunk1, parts: 2, size: 2, ..MessageRecord::text(payer, SENTINEL, "a") };
        let ix = post_message_instruction(&program, &channel, &SENTINEL, &NONCE, &head).unwrap();
        let err = process_instruction(&program, &mut store, &ix, &[payer]).unwrap_err();
        assert_eq!(err, RejectionError::new(RejectReason::AccountNotFound, chunk1));

        let tail_chunk = MessageRecord { parts: 2, size: 2, ..MessageRecord::text(payer, SENTINEL, "b") };
        let ix = write_chunk_instruction(&program, &channel, &SENTINEL, &NONCE, 1, &tail_chunk).unwrap();
        process_instruction(&program, &mut store, &ix, &[payer]).unwrap();
        let ix = post_message_instruction(&program, &channel, &SENTINEL, &NONCE, &head).unwrap();
        process_instruction(&program, &mut store, &ix, &[payer]).unwrap();
    }

    #[test]
    fn chunk_part_must_be_in_range() {
        let (program, payer, channel, mut store) = setup("general");
        let record = MessageRecord { parts: 2, ..MessageRecord::text(payer, SENTINEL, "b") };
        let ix = write_chunk_instruction(&program, &channel, &SENTINEL, &NONCE, 2, &record).unwrap();
        let err = process_instruction(&program, &mut store, &ix, &[payer]).unwrap_err();
        assert!(err.is(RejectReason::InvalidInstruction));
    }

    #[test]
    fn oversize_record_is_rejected() {
        let (program, payer, channel, mut store) = setup("general");
        let record = MessageRecord::text(payer, SENTINEL, "x".repeat(MAX_RECORD_BYTES));
        let ix = post_message_instruction(&program, &channel, &SENTINEL, &NONCE, &record).unwrap();
        let err = process_instruction(&program, &mut store, &ix, &[payer]).unwrap_err();
        assert!(err.is(RejectReason::RecordTooLarge));
    }
}
