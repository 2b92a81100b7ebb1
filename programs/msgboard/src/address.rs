//! Program-derived addresses.
//!
//! derive_address: seeds + program id -> off-curve address, no registry needed.
//! Channel seeds: lower-cased name cut into <= 32-byte chunks (char boundaries).
//! Chunk seeds: [sender, channel, anchor, nonce, part_le], anchor = tail seen at
//! append start, nonce = digest of the message (see message_nonce).

use anchor_lang::solana_program::{
    hash::hashv,
    pubkey::{Pubkey, MAX_SEEDS, MAX_SEED_LEN},
};

use crate::error::AddressDerivationError;

/// Opaque 32-byte record identifier.
pub type Address = Pubkey;

/// Terminates every chain; also the tail of an empty channel.
pub const SENTINEL: Address = Pubkey::new_from_array([0u8; 32]);

/// Caller seeds allowed per derivation (the bump occupies the last slot).
pub const MAX_CALLER_SEEDS: usize = MAX_SEEDS - 1;

/// Derives the address for `seeds` under `program_id`.
pub fn derive_address(
    program_id: &Pubkey,
    seeds: &[&[u8]],
) -> Result<Address, AddressDerivationError> {
    if seeds.len() > MAX_CALLER_SEEDS {
        return Err(AddressDerivationError::TooManySeeds {
            count: seeds.len(),
            max: MAX_CALLER_SEEDS,
        });
    }
    if let Some((index, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(AddressDerivationError::SeedTooLong {
            index,
            len: seed.len(),
            max: MAX_SEED_LEN,
        });
    }
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, _bump)| address)
        .ok_or(AddressDerivationError::NoViableBump)
}

/// Splits a channel name into derivation seeds.
pub fn channel_seeds(name: &str) -> Result<Vec<Vec<u8>>, AddressDerivationError> {
    let lowered = name.to_lowercase();
    let mut seeds: Vec<Vec<u8>> = Vec::new();
    let mut current = Vec::with_capacity(MAX_SEED_LEN);
    for c in lowered.chars() {
        let mut buf = [0u8; 4];
        let bytes = c.encode_utf8(&mut buf).as_bytes();
        if current.len() + bytes.len() > MAX_SEED_LEN {
            seeds.push(std::mem::take(&mut current));
        }
        current.extend_from_slice(bytes);
    }
    if !current.is_empty() {
        seeds.push(current);
    }
    if seeds.len() > MAX_CALLER_SEEDS {
        return Err(AddressDerivationError::TooManySeeds {
            count: seeds.len(),
            max: MAX_CALLER_SEEDS,
        });
    }
    Ok(seeds)
}

/// Address of the channel called `name`.
pub fn channel_address(program_id: &Pubkey, name: &str) -> Result<Address, AddressDerivationError> {
    let seeds = channel_seeds(name)?;
    let seed_slice = &seeds.iter().map(|x| &x[..]).collect::<Vec<&[u8]>>()[..];
    derive_address(program_id, seed_slice)
}

/// Seed that separates messages appended on top of the same anchor.
///
/// Content derived: retrying the same message lands on the same addresses,
/// a different message never collides with chunks an abandoned append left.
pub fn message_nonce(text: &str, parts: u64) -> [u8; 32] {
    hashv(&[&parts.to_le_bytes(), text.as_bytes()]).to_bytes()
}

/// Address of chunk `part` of the message `sender` appends on top of `anchor`.
pub fn message_address(
    program_id: &Pubkey,
    sender : &Address,
    channel: &Address,
    anchor : &Address,
    nonce  : &[u8; 32],
    part   : u64,
) -> Result<Address, AddressDerivationError> {
    derive_address(
        program_id,
        &[
            sender.as_ref(),
            channel.as_ref(),
            anchor.as_ref(),
            nonce,
            &part.to_le_bytes(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let program = Pubkey::new_unique();
        let a = derive_address(&program, &[&b"alpha"[..], &b"beta"[..]]).unwrap();
        let b = derive_address(&program, &[&b"alpha"[..], &b"beta"[..]]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, SENTINEL);
    }

    #[test]
    fn seed_order_matters() {
        let program = Pubkey::new_unique();
        let a = derive_address(&program, &[&b"alpha"[..], &b"beta"[..]]).unwrap();
        let b = derive_address(&program, &[&b"beta"[..], &b"alpha"[..]]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn program_id_matters() {
        let a = derive_address(&Pubkey::new_unique(), &[&b"x"[..]]).unwrap();
        let b = derive_address(&Pubkey::new_unique(), &[&b"x"[..]]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn too_many_seeds() {
        let seeds = vec![&b"s"[..]; MAX_CALLER_SEEDS + 1];
        let err = derive_address(&Pubkey::new_unique(), &seeds).unwrap_err();
        assert_eq!(
            err,
            AddressDerivationError::TooManySeeds { count: MAX_CALLER_SEEDS + 1, max: MAX_CALLER_SEEDS }
        );
    }

    #[test]
    fn seed_too_long() {
        let long = [7u8; MAX_SEED_LEN + 1];
        let err = derive_address(&Pubkey::new_unique(), &[&b"ok"[..], &long[..]]).unwrap_err();
        assert_eq!(err, AddressDerivationError::SeedTooLong { index: 1, len: 33, max: 32 });
    }

    #[test]
    fn channel_seeds_max_length() {
        let name = "X".repeat(MAX_SEED_LEN * MAX_CALLER_SEEDS);
        let seeds = channel_seeds(&name).unwrap();
        assert_eq!(seeds.len(), MAX_CALLER_SEEDS);
        assert!(seeds.iter().all(|s| s.len() == MAX_SEED_LEN));
        assert!(seeds.iter().all(|s| s.iter().all(|b| *b == b'x')));
    }

    #[test]
    fn channel_seeds_too_long() {
        let name = "X".repeat(MAX_SEED_LEN * MAX_CALLER_SEEDS + 1);
        assert!(channel_seeds(&name).is_err());
    }

    #[test]
    fn channel_seeds_keep_chars_whole() {
        // 'é' is two bytes; 20 of them cannot share one 32-byte seed.
        let seeds = channel_seeds(&"é".repeat(20)).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].len(), 32);
        assert_eq!(seeds[1].len(), 8);
        assert!(seeds.iter().all(|s| std::str::from_utf8(s).is_ok()));
    }

    #[test]
    fn channel_names_are_case_insensitive() {
        let program = Pubkey::new_unique();
        assert_eq!(
            channel_address(&program, "General").unwrap(),
            channel_address(&program, "general").unwrap()
        );
        assert_ne!(
            channel_address(&program, "general").unwrap(),
            channel_address(&program, "random").unwrap()
        );
    }

    #[test]
    fn message_addresses_differ_per_part_anchor_and_nonce() {
        let program = Pubkey::new_unique();
        let (sender, channel) = (Pubkey::new_unique(), Pubkey::new_unique());
        let nonce = message_nonce("hello", 1);
        let head = message_address(&program, &sender, &channel, &SENTINEL, &nonce, 0).unwrap();
        let second = message_address(&program, &sender, &channel, &SENTINEL, &nonce, 1).unwrap();
        let later = message_address(&program, &sender, &channel, &head, &nonce, 0).unwrap();
        let other = message_address(&program, &sender, &channel, &SENTINEL, &message_nonce("bye", 1), 0).unwrap();
        assert_ne!(head, second);
        assert_ne!(head, later);
        assert_ne!(head, other);
    }

    #[test]
    fn nonce_depends_on_text_and_parts() {
        assert_eq!(message_nonce("hello", 2), message_nonce("hello", 2));
        assert_ne!(message_nonce("hello", 2), message_nonce("hello", 1));
        assert_ne!(message_nonce("hello", 2), message_nonce("hellO", 2));
    }
}
