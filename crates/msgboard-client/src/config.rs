//! Client configuration, passed explicitly to every client instance.

use anchor_lang::solana_program::pubkey::Pubkey;
use msgboard_program::state::MAX_CHUNK_PAYLOAD;
use thiserror::Error;

/// Smallest chunk limit that always fits one UTF-8 character.
pub const MIN_CHUNK_BYTES: usize = 4;

pub const DEFAULT_MAX_TRAVERSAL_STEPS: usize = 10_000;
pub const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    /// Program that owns channel and message records.
    pub program_id: Pubkey,
    /// Payload bytes per chunk record.
    pub max_chunk_bytes: usize,
    /// Upper bound on records fetched by one traversal.
    pub max_traversal_steps: usize,
    /// Whole-append retries after losing the tail race.
    pub max_append_attempts: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::new(msgboard_program::id())
    }
}

impl BoardConfig {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            max_chunk_bytes: MAX_CHUNK_PAYLOAD,
            max_traversal_steps: DEFAULT_MAX_TRAVERSAL_STEPS,
            max_append_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
        }
    }

    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.max_chunk_bytes = bytes;
        self
    }

    pub fn with_traversal_steps(mut self, steps: usize) -> Self {
        self.max_traversal_steps = steps;
        self
    }

    pub fn with_append_attempts(mut self, attempts: u32) -> Self {
        self.max_append_attempts = attempts;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CHUNK_BYTES..=MAX_CHUNK_PAYLOAD).contains(&self.max_chunk_bytes) {
            return Err(ConfigError::ChunkBytes {
                value: self.max_chunk_bytes,
                min: MIN_CHUNK_BYTES,
                max: MAX_CHUNK_PAYLOAD,
            });
        }
        if self.max_traversal_steps == 0 {
            return Err(ConfigError::Zero("max_traversal_steps"));
        }
        if self.max_append_attempts == 0 {
            return Err(ConfigError::Zero("max_append_attempts"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_chunk_bytes {value} outside {min}..={max}")]
    ChunkBytes { value: usize, min: usize, max: usize },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
