//! Lazy channel traversal, newest message first.
//!
//! Start at the channel tail and follow `next` until SENTINEL. A head record
//! with parts = N is followed by its N - 1 chunks (same sender, size, parts).
//! Every visited address is remembered so a cycle ends the walk with an error
//! instead of looping; `max_traversal_steps` bounds the walk as a whole.
//!
//! After an IncompleteMessage caused by a foreign record, that record is kept
//! as the next head and the walk continues. Every other error ends the walk
//! until restart().

use std::collections::HashSet;

use msgboard_program::{Address, ChannelRecord, MessageRecord, Payload, SENTINEL};
use tracing::debug;

use crate::{
    client::{fetch_record, BoardClient},
    error::BoardError,
    ledger::Ledger,
};

/// One reassembled message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Address of the head chunk.
    pub address: Address,
    pub sender : Address,
    pub payload: Payload,
    pub size   : u64,
    pub parts  : u64,
    /// Chunk addresses in chain order, head first.
    pub chunks : Vec<Address>,
}

impl Message {
    pub fn text(&self) -> &str {
        self.payload.as_text()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cursor {
    Start,
    At(Address),
    Done,
}

/// Pull-based iterator over the messages of one channel.
pub struct MessageStream<'a, L> {
    ledger   : &'a L,
    channel  : Address,
    max_steps: usize,
    cursor   : Cursor,
    visited  : HashSet<Address>,
    steps    : usize,
    pending  : Option<(Address, MessageRecord)>,
}

impl<'a, L: Ledger> MessageStream<'a, L> {
    fn new(ledger: &'a L, channel: Address, max_steps: usize) -> Self {
        Self {
            ledger,
            channel,
            max_steps,
            cursor: Cursor::Start,
            visited: HashSet::new(),
            steps: 0,
            pending: None,
        }
    }

    pub fn channel(&self) -> &Address {
        &self.channel
    }

    /// Records fetched so far in this pass.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Drops all progress; the next call re-reads the channel tail.
    pub fn restart(&mut self) {
        self.cursor = Cursor::Start;
        self.visited.clear();
        self.steps = 0;
        self.pending = None;
    }

    /// Next message, or None once the chain (or the walk) has ended.
    pub async fn next(&mut self) -> Option<Result<Message, BoardError>> {
        let head = match self.pending.take() {
            Some(pending) => pending,
            None => {
                let cursor = self.cursor;
                let address = match cursor {
                    Cursor::Done => return None,
                    Cursor::At(address) => address,
                    Cursor::Start => match self.read_tail().await {
                        Ok(tail) if tail == SENTINEL => {
                            self.cursor = Cursor::Done;
                            return None;
                        }
                        Ok(tail) => tail,
                        Err(e) => return Some(self.fail(e)),
                    },
                };
                match self.visit(address).await {
                    Ok(record) => (address, record),
                    Err(e) => return Some(self.fail(e)),
                }
            }
        };
        Some(self.assemble(head).await)
    }

    /// Drains the rest of the stream; stops at the first error.
    pub async fn collect(mut self) -> Result<Vec<Message>, BoardError> {
        let mut messages = Vec::new();
        while let Some(message) = self.next().await {
            messages.push(message?);
        }
        Ok(messages)
    }

    async fn read_tail(&mut self) -> Result<Address, BoardError> {
        let channel: ChannelRecord = fetch_record(self.ledger, &self.channel).await?;
        debug!(channel = %self.channel, name = %channel.name, tail = %channel.tail, "walk started");
        Ok(channel.tail)
    }

    async fn visit(&mut self, address: Address) -> Result<MessageRecord, BoardError> {
        if !self.visited.insert(address) {
            return Err(BoardError::CycleDetected {
                channel: self.channel,
                address,
                steps: self.steps,
            });
        }
        if self.steps >= self.max_steps {
            return Err(BoardError::ChainTooLong { channel: self.channel, limit: self.max_steps });
        }
        self.steps += 1;
        debug!(channel = %self.channel, %address, step = self.steps, "fetching record");
        fetch_record(self.ledger, &address).await
    }

    fn fail<T>(&mut self, err: BoardError) -> Result<T, BoardError> {
        debug!(channel = %self.channel, error = %err, "walk ended");
        self.cursor = Cursor::Done;
        Err(err)
    }

    fn advance(&mut self, next: Address) {
        self.cursor = if next == SENTINEL { Cursor::Done } else { Cursor::At(next) };
    }

    async fn assemble(&mut self, (address, head): (Address, MessageRecord)) -> Result<Message, BoardError> {
        if head.parts == 0 {
            let err = BoardError::CorruptMessage {
                channel: self.channel,
                address,
                detail: "record claims zero parts".into(),
            };
            return self.fail(err);
        }

        let mut text = head.payload.as_text().to_owned();
        let mut chunks = vec![address];
        let mut next = head.next;
        for _ in 1..head.parts {
            let found = chunks.len() as u64;
            if next == SENTINEL {
                let err = self.incomplete(address, head.parts, found);
                return self.fail(err);
            }
            let record = match self.visit(next).await {
                Ok(record) => record,
                Err(e) => return self.fail(e),
            };
            let same_message = record.sender == head.sender
                && record.size == head.size
                && record.parts == head.parts;
            if !same_message {
                // The foreign record starts the next message.
                self.pending = Some((next, record));
                return Err(self.incomplete(address, head.parts, found));
            }
            text.push_str(record.payload.as_text());
            chunks.push(next);
            next = record.next;
        }

        if text.len() as u64 != head.size {
            let err = BoardError::CorruptMessage {
                channel: self.channel,
                address,
                detail: format!("declared size {} but chunks hold {} bytes", head.size, text.len()),
            };
            return self.fail(err);
        }

        self.advance(next);
        debug!(channel = %self.channel, %address, parts = head.parts, "message read");
        Ok(Message {
            address,
            sender: head.sender,
            payload: Payload::Text(text),
            size: head.size,
            parts: head.parts,
            chunks,
        })
    }

    fn incomplete(&self, address: Address, expected: u64, found: u64) -> BoardError {
        BoardError::IncompleteMessage { channel: self.channel, address, expected, found }
    }
}

impl<L: Ledger> BoardClient<L> {
    /// Lazily lists the messages of `channel`, newest first.
    pub fn list_messages(&self, channel: &Address) -> MessageStream<'_, L> {
        MessageStream::new(&self.ledger, *channel, self.config.max_traversal_steps)
    }

    /// Reads every message of `channel`; fails on the first error.
    pub async fn collect_messages(&self, channel: &Address) -> Result<Vec<Message>, BoardError> {
        self.list_messages(channel).collect().await
    }
}
