// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PBKDF2-HMAC-SHA256 password hashing and username lookup hashing.
//!
//! Password digests are stored as `"<hex salt>:<hex digest>"` with a 16-byte
//! random salt. Verification goes through `ring::pbkdf2::verify`, which
//! compares in constant time.

use std::num::NonZeroU32;

use medvault_core::MedvaultError;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

/// Default PBKDF2-HMAC-SHA256 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 260_000;

const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// Hash a password with PBKDF2-HMAC-SHA256 and a fresh random salt.
///
/// Returns the storable `"<hex salt>:<hex digest>"` blob.
pub fn hash_password(password: &str, iterations: u32) -> Result<String, MedvaultError> {
    let iterations = NonZeroU32::new(iterations)
        .ok_or_else(|| MedvaultError::Config("pbkdf2 iterations must be non-zero".to_string()))?;

    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| MedvaultError::Crypto("failed to generate password salt".to_string()))?;

    let mut digest = [0u8; DIGEST_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut digest,
    );

    Ok(format!("{}:{}", hex::encode(salt), hex::encode(digest)))
}

/// Verify a password against a stored `"<hex salt>:<hex digest>"` blob.
///
/// Malformed blobs verify as false rather than erroring; the caller treats
/// both the same way (authentication failure).
pub fn verify_password(password: &str, blob: &str, iterations: u32) -> bool {
    let Some((hex_salt, hex_digest)) = blob.split_once(':') else {
        return false;
    };
    let (Ok(salt), Ok(digest)) = (hex::decode(hex_salt), hex::decode(hex_digest)) else {
        return false;
    };
    let Some(iterations) = NonZeroU32::new(iterations) else {
        return false;
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &digest,
    )
    .is_ok()
}

/// SHA-256 hex of the trimmed, lowercased username.
///
/// Used as the unique lookup key in the users table; the raw username is
/// only kept as a display name.
pub fn username_lookup_hash(username: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}
