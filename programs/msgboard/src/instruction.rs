//! Instruction envelope.
//!
//! CreateChannel: [payer (signer), channel]
//! WriteChunk   : [sender (signer), chunk, channel]        non-head chunk of a message
//! PostMessage  : [sender (signer), channel, head]         head chunk + tail update, one step
//!
//! Records travel already encoded, so the processor stores exactly the bytes
//! the client built. `anchor` and `nonce` are the address seeds of the message.

use anchor_lang::solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    address::{self, Address},
    codec::Record,
    error::AddressDerivationError,
    state::{ChannelRecord, MessageRecord},
};

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, PartialEq, Eq)]
pub enum BoardInstruction {
    CreateChannel {
        record: Vec<u8>,
    },
    WriteChunk {
        anchor: [u8; 32],
        nonce : [u8; 32],
        part  : u64,
        record: Vec<u8>,
    },
    PostMessage {
        anchor: [u8; 32],
        nonce : [u8; 32],
        record: Vec<u8>,
    },
}

impl BoardInstruction {
    pub fn pack(&self) -> std::io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    pub fn unpack(data: &[u8]) -> std::io::Result<Self> {
        Self::try_from_slice(data)
    }
}

/// Builds the create channel instruction.
pub fn create_channel_instruction(
    program_id: &Pubkey,
    name: &str,
    payer: &Address,
) -> Result<Instruction, BuildError> {
    let channel = address::channel_address(program_id, name)?;
    let data = BoardInstruction::CreateChannel {
        record: ChannelRecord::new(name).encode()?,
    }
    .pack()?;
    Ok(Instruction {
        program_id: *program_id,
        data,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(channel, false),
        ],
    })
}

/// Builds the instruction that stores one non-head chunk record.
pub fn write_chunk_instruction(
    program_id: &Pubkey,
    channel: &Address,
    anchor : &Address,
    nonce  : &[u8; 32],
    part   : u64,
    record : &MessageRecord,
) -> Result<Instruction, BuildError> {
    let chunk = address::message_address(program_id, &record.sender, channel, anchor, nonce, part)?;
    let data = BoardInstruction::WriteChunk {
        anchor: anchor.to_bytes(),
        nonce: *nonce,
        part,
        record: record.encode()?,
    }
    .pack()?;
    Ok(Instruction {
        program_id: *program_id,
        data,
        accounts: vec![
            AccountMeta::new(record.sender, true),
            AccountMeta::new(chunk, false),
            AccountMeta::new_readonly(*channel, false),
        ],
    })
}

/// Builds the instruction that stores the head record and advances the tail.
pub fn post_message_instruction(
    program_id: &Pubkey,
    channel: &Address,
    anchor : &Address,
    nonce  : &[u8; 32],
    record : &MessageRecord,
) -> Result<Instruction, BuildError> {
    let head = address::message_address(program_id, &record.sender, channel, anchor, nonce, 0)?;
    let data = BoardInstruction::PostMessage {
        anchor: anchor.to_bytes(),
        nonce: *nonce,
        record: record.encode()?,
    }
    .pack()?;
    Ok(Instruction {
        program_id: *program_id,
        data,
        accounts: vec![
            AccountMeta::new(record.sender, true),
            AccountMeta::new(*channel, false),
            AccountMeta::new(head, false),
        ],
    })
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Derivation(#[from] AddressDerivationError),

    #[error("serialization failed: {0}")]
    Serialize(#[from] std::io::Error),
}
