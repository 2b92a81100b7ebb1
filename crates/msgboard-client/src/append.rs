//! Message append with chunking.
//!
//! Text larger than one record is cut into `parts` chunks, each a MessageRecord
//! carrying the total `size` and `parts`. Chunk i links to chunk i+1; the last
//! chunk links to the old tail. Non-head chunks are written oldest first, then
//! the head chunk is stored together with the tail update in one instruction.
//! Losing the tail race restarts the whole append from a fresh tail.
//!
//! Chunk addresses are derived from the anchor and a digest of the message, so
//! calling append again after an interrupted attempt finds the chunks it
//! already wrote and resumes. Occupied addresses holding other bytes are
//! never overwritten.

use msgboard_program::{
    address::{message_address, message_nonce},
    codec::Record,
    instruction::{post_message_instruction, write_chunk_instruction, BuildError},
    Address, MessageRecord, Payload, RejectReason,
};
use tracing::{debug, info, warn};

use crate::{
    client::BoardClient,
    error::BoardError,
    ledger::{Credential, Ledger, LedgerError},
};

/// Cuts `text` into chunks of at most `limit` bytes on character boundaries.
/// Empty text is a single empty chunk.
pub fn plan_chunks(text: &str, limit: usize) -> Vec<&str> {
    if text.is_empty() {
        return vec![""];
    }
    let mut chunks = Vec::with_capacity(text.len().div_ceil(limit.max(1)));
    let mut rest = text;
    while !rest.is_empty() {
        let mut cut = limit.min(rest.len());
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // Limit narrower than the next character: take the character whole.
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

impl<L: Ledger> BoardClient<L> {
    /// Appends `text` to `channel` as `sender`; returns the head record address.
    pub async fn append_message<C: Credential + ?Sized>(
        &self,
        channel: &Address,
        sender: &C,
        text: &str,
    ) -> Result<Address, BoardError> {
        let program_id = &self.config.program_id;
        let sender = sender.address();
        let chunks = plan_chunks(text, self.config.max_chunk_bytes);
        let parts = chunks.len() as u64;
        let size = text.len() as u64;
        let nonce = message_nonce(text, parts);

        for attempt in 1..=self.config.max_append_attempts {
            let anchor = self.read_channel(channel).await?.tail;
            let addresses = (0..parts)
                .map(|part| message_address(program_id, &sender, channel, &anchor, &nonce, part))
                .collect::<Result<Vec<_>, _>>()?;
            let records: Vec<MessageRecord> = chunks
                .iter()
                .enumerate()
                .map(|(part, chunk)| MessageRecord {
                    sender,
                    next: addresses.get(part + 1).copied().unwrap_or(anchor),
                    payload: Payload::Text((*chunk).to_owned()),
                    size,
                    parts,
                })
                .collect();

            // Read before write: never overwrite an occupied derived address.
            let head = addresses[0];
            if self.fetch(&head).await?.is_some() {
                return Err(BoardError::AddressInUse { address: head });
            }
            let mut missing = Vec::with_capacity(records.len());
            for part in (1..records.len()).rev() {
                let expected = records[part].encode().map_err(BuildError::from)?;
                match self.fetch(&addresses[part]).await? {
                    None => missing.push(part),
                    Some(stored) if stored == expected => {
                        debug!(%channel, part, parts, "chunk already written, resuming");
                    }
                    Some(_) => return Err(BoardError::AddressInUse { address: addresses[part] }),
                }
            }

            for part in missing {
                let ix = write_chunk_instruction(program_id, channel, &anchor, &nonce, part as u64, &records[part])?;
                self.ledger
                    .submit_transaction(&[ix], &[sender])
                    .await
                    .map_err(|e| BoardError::from_ledger(addresses[part], e))?;
                debug!(%channel, part, parts, "chunk written");
            }

            let ix = post_message_instruction(program_id, channel, &anchor, &nonce, &records[0])?;
            match self.ledger.submit_transaction(&[ix], &[sender]).await {
                Ok(()) => {
                    info!(%channel, %head, size, parts, "message appended");
                    return Ok(head);
                }
                Err(LedgerError::Rejected(r)) if r.is(RejectReason::TailMoved) => {
                    warn!(%channel, attempt, "tail moved during append, retrying");
                }
                Err(e) => return Err(BoardError::from_ledger(head, e)),
            }
        }

        Err(BoardError::AppendContended {
            channel: *channel,
            attempts: self.config.max_append_attempts,
        })
    }
}
