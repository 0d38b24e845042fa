//! # Password Hashing
//!
//! Salted, iterated HMAC-SHA256 (one PBKDF2 block). Stored as
//! `v1$<iterations>$<salt-hex>$<hash-hex>`.

use crate::errors::CoreError;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "v1";
const SALT_LEN: usize = 16;

/// Iteration count for new hashes.
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Upper bound accepted when verifying, so a crafted hash cannot pin a CPU.
const MAX_ITERATIONS: u32 = 1_000_000;

fn derive(password: &[u8], salt: &[u8], iterations: u32) -> Option<[u8; 32]> {
    let keyed = HmacSha256::new_from_slice(password).ok()?;
    let mac = |data: &[&[u8]]| -> [u8; 32] {
        let mut m = keyed.clone();
        for part in data {
            m.update(part);
        }
        m.finalize().into_bytes().into()
    };

    let mut u = mac(&[salt, &1u32.to_be_bytes()]);
    let mut out = u;
    for _ in 1..iterations {
        u = mac(&[&u]);
        for (o, b) in out.iter_mut().zip(u.iter()) {
            *o ^= b;
        }
    }
    Some(out)
}

/// Hash with the default iteration count and a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, CoreError> {
    hash_password_with(plain, DEFAULT_ITERATIONS)
}

pub fn hash_password_with(plain: &str, iterations: u32) -> Result<String, CoreError> {
    let iterations = iterations.max(1);
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(plain.as_bytes(), &salt, iterations)
        .ok_or_else(|| CoreError::validation("Password could not be hashed"))?;
    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(hash)
    ))
}

/// Check `plain` against an encoded hash. Malformed hashes never verify.
pub fn verify_password(plain: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(SCHEME), Some(iter), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Ok(iterations) = iter.parse::<u32>() else {
        return false;
    };
    if iterations == 0 || iterations > MAX_ITERATIONS {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };

    let Some(actual) = derive(plain.as_bytes(), &salt, iterations) else {
        return false;
    };
    actual.as_slice().ct_eq(expected.as_slice()).into()
}
