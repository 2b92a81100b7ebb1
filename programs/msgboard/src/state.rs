//! On-ledger record layout and size rationale.
//!
//! ChannelRecord: name + tail pointer. Allocated at a fixed capacity.
//! MessageRecord: one message, or one chunk of an over-size message.
//! Max record size 1,200B, so a chunk carries at most 1,115 payload bytes.

use anchor_lang::prelude::{AnchorDeserialize, AnchorSerialize};

use crate::{
    address::Address,
    codec::{self, Field, FieldKind, Record},
};

// Size constants
pub const MAX_RECORD_BYTES: usize = 1_200; // Hard upper bound per record
pub const MAX_NAME_LEN    : usize = 100;
pub const CHANNEL_SPACE   : usize = codec::min_len(ChannelRecord::SCHEMA) + MAX_NAME_LEN; // = 136
pub const MESSAGE_HEAD    : usize = codec::min_len(MessageRecord::SCHEMA); // = 85
pub const MAX_CHUNK_PAYLOAD: usize = MAX_RECORD_BYTES - MESSAGE_HEAD; // = 1,115

// Payload discriminants (borsh variant index)
pub const PAYLOAD_TEXT: u8 = 0;

/// Message content. The leading tag lets readers dispatch on the kind.
#[derive(Clone, Debug, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub enum Payload {
    Text(String),
}

impl Payload {
    pub fn tag(&self) -> u8 {
        match self {
            Payload::Text(_) => PAYLOAD_TEXT,
        }
    }

    /// Encoded body length, excluding the tag.
    pub fn body_len(&self) -> usize {
        match self {
            Payload::Text(s) => codec::LEN_PREFIX + s.len(),
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Payload::Text(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct ChannelRecord {
    pub name: String,
    pub tail: Address,
}

impl ChannelRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), tail: crate::SENTINEL }
    }

    pub fn is_empty(&self) -> bool {
        self.tail == crate::SENTINEL
    }
}

impl Record for ChannelRecord {
    const SCHEMA: &'static [Field] = &[
        Field::new("name", FieldKind::Str),
        Field::new("tail", FieldKind::Address),
    ];
}

/// One message, or one chunk of a message split over `parts` records.
#[derive(Clone, Debug, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct MessageRecord {
    pub sender : Address,
    pub next   : Address, // older record, or SENTINEL
    pub payload: Payload,
    pub size   : u64,     // total payload bytes of the whole message
    pub parts  : u64,     // total chunk records of the whole message
}

impl MessageRecord {
    /// Single-record message.
    pub fn text(sender: Address, next: Address, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            sender,
            next,
            size: text.len() as u64,
            parts: 1,
            payload: Payload::Text(text),
        }
    }

    pub fn encoded_len(&self) -> usize {
        MESSAGE_HEAD - codec::LEN_PREFIX + self.payload.body_len()
    }
}

impl Record for MessageRecord {
    const SCHEMA: &'static [Field] = &[
        Field::new("sender",  FieldKind::Address),
        Field::new("next",    FieldKind::Address),
        Field::new("payload", FieldKind::Payload),
        Field::new("size",    FieldKind::U64),
        Field::new("parts",   FieldKind::U64),
    ];
}

/// Channel names: non-empty, at most MAX_NAME_LEN bytes, no edge whitespace.
pub fn channel_name_is_valid(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    let mut chars = name.chars();
    let first = chars.next().is_some_and(char::is_whitespace);
    let last = chars.next_back().is_some_and(char::is_whitespace);
    !(first || last)
}
