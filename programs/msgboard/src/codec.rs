//! Binary codec for on-ledger records.
//!
//! Records are borsh encoded, as every account of the program is: fixed field
//! order, little-endian integers, strings as u32 length + UTF-8 bytes,
//! addresses as 32 raw bytes, enums as a u8 tag followed by the variant body.
//! Decode reads exactly what the record needs and ignores trailing bytes
//! (accounts are allocated at a fixed capacity and zero padded).
//!
//! Each record type also carries a static schema table. `layout` walks
//! encoded bytes with it, which both reports field offsets and names the
//! field a failed decode stopped at.

use std::{io, ops::Range};

use anchor_lang::prelude::{AnchorDeserialize, AnchorSerialize};
use thiserror::Error;

use crate::{address::Address, state::PAYLOAD_TEXT};

pub const ADDRESS_LEN: usize = 32;
pub const LEN_PREFIX : usize = 4;
pub const U64_LEN    : usize = 8;
pub const TAG_LEN    : usize = 1;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated at field `{field}`: need {needed} bytes, {available} available")]
    Truncated { field: &'static str, needed: usize, available: usize },

    #[error("unknown payload variant {tag}")]
    UnknownVariant { tag: u8 },

    #[error("field `{field}` is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("malformed record: {reason}")]
    Malformed { reason: String },
}

/// Wire encoding rule of one field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Address,
    Str,
    U64,
    Payload,
}

impl FieldKind {
    /// Bytes the field occupies before any variable-length body.
    pub const fn fixed_len(self) -> usize {
        match self {
            FieldKind::Address => ADDRESS_LEN,
            FieldKind::Str     => LEN_PREFIX,
            FieldKind::U64     => U64_LEN,
            // tag + string length prefix of the only known variant
            FieldKind::Payload => TAG_LEN + LEN_PREFIX,
        }
    }
}

/// One row of a record schema table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Smallest encoding a schema admits (all strings empty).
pub const fn min_len(schema: &[Field]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < schema.len() {
        total += schema[i].kind.fixed_len();
        i += 1;
    }
    total
}

/// A borsh record type with a static schema table describing its layout.
pub trait Record: AnchorSerialize + AnchorDeserialize {
    /// Field order on the wire.
    const SCHEMA: &'static [Field];

    fn encode(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(min_len(Self::SCHEMA));
        self.serialize(&mut buf)?;
        Ok(buf)
    }

    /// Decodes the leading record in `bytes`; trailing bytes are padding.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::deserialize(&mut &bytes[..]).map_err(|err| diagnose(Self::SCHEMA, bytes, err))
    }
}

/// Names the field a failed borsh decode stopped at.
fn diagnose(schema: &[Field], bytes: &[u8], err: io::Error) -> DecodeError {
    match layout(schema, bytes) {
        Err(precise) => precise,
        Ok(_) => DecodeError::Malformed { reason: err.to_string() },
    }
}

/// Cursor over encoded bytes; every read names the field it serves.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated { field, needed: n, available: self.remaining() });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(TAG_LEN, field)?[0])
    }

    pub fn u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        let mut le = [0u8; U64_LEN];
        le.copy_from_slice(self.take(U64_LEN, field)?);
        Ok(u64::from_le_bytes(le))
    }

    pub fn address(&mut self, field: &'static str) -> Result<Address, DecodeError> {
        let mut raw = [0u8; ADDRESS_LEN];
        raw.copy_from_slice(self.take(ADDRESS_LEN, field)?);
        Ok(Address::new_from_array(raw))
    }

    pub fn str(&mut self, field: &'static str) -> Result<&'a str, DecodeError> {
        let mut le = [0u8; LEN_PREFIX];
        le.copy_from_slice(self.take(LEN_PREFIX, field)?);
        let len = u32::from_le_bytes(le) as usize;
        let raw = self.take(len, field)?;
        std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8 { field })
    }
}

/// Byte range a field occupies inside an encoded record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpan {
    pub name : &'static str,
    pub kind : FieldKind,
    pub range: Range<usize>,
}

/// Walks `bytes` with a schema table and reports where each field sits.
pub fn layout(schema: &[Field], bytes: &[u8]) -> Result<Vec<FieldSpan>, DecodeError> {
    let mut r = Reader::new(bytes);
    let mut spans = Vec::with_capacity(schema.len());
    for field in schema {
        let start = r.position();
        match field.kind {
            FieldKind::Address => {
                r.address(field.name)?;
            }
            FieldKind::Str => {
                r.str(field.name)?;
            }
            FieldKind::U64 => {
                r.u64(field.name)?;
            }
            FieldKind::Payload => match r.u8(field.name)? {
                PAYLOAD_TEXT => {
                    r.str(field.name)?;
                }
                tag => return Err(DecodeError::UnknownVariant { tag }),
            },
        }
        spans.push(FieldSpan { name: field.name, kind: field.kind, range: start..r.position() });
    }
    Ok(spans)
}
