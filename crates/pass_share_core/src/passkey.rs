//! Passkeys name a session on the remote service and are short enough to be
//! read out loud.

use rand::Rng;

use crate::ports::{PortError, PortResult};

pub const PASSKEY_LENGTH: usize = 8;

pub const PASSKEY_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws a fresh passkey, uniformly and with replacement, from [`PASSKEY_ALPHABET`].
///
/// Collisions are the server's problem.
pub fn generate_passkey() -> String {
    generate_passkey_with(&mut rand::thread_rng())
}

pub fn generate_passkey_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..PASSKEY_LENGTH)
        .map(|_| PASSKEY_ALPHABET[rng.gen_range(0..PASSKEY_ALPHABET.len())] as char)
        .collect()
}

/// Normalizes a passkey typed by a user.
///
/// Only emptiness is checked here; whether the passkey names a live session
/// is for the server to say.
pub fn normalize_passkey(input: &str) -> PortResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PortError::Validation("Please enter a passkey".to_string()));
    }
    Ok(trimmed.to_uppercase())
}
