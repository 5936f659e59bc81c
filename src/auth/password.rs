// src/auth/password.rs
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::auth::token::hashes_equal;

const SALT_BYTES: usize = 16;

/// Hash a password with a fresh random salt. Stored as `salt$hash`, both
/// base64.
pub fn hash_password(password: &str) -> String {
    let mut rng = OsRng;
    hash_password_with(&mut rng, password)
}

pub fn hash_password_with<R: RngCore>(rng: &mut R, password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rng.fill_bytes(&mut salt);

    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}${}",
        engine.encode(salt),
        engine.encode(digest(&salt, password))
    )
}

/// Check a password against a stored `salt$hash` string.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let Some((salt_part, hash_part)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (engine.decode(salt_part), engine.decode(hash_part)) else {
        return false;
    };
    hashes_equal(&digest(&salt, password), &expected)
}

fn digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}
