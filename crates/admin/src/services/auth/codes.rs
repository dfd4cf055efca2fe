//! One-time secrets: 2FA backup codes and password reset tokens.
//!
//! Only SHA-256 digests of either are persisted. Both carry enough entropy
//! that an unsalted digest is sufficient.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Backup codes issued when 2FA is enabled.
pub const BACKUP_CODE_COUNT: usize = 8;

const BACKUP_CODE_LEN: usize = 8;
const BACKUP_CODE_GROUP: usize = 4;
// 32 symbols, so `byte % len` is unbiased. No 0/O or 1/I.
const BACKUP_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const RESET_TOKEN_BYTES: usize = 32;

/// Lowercase hex SHA-256 of `value`.
#[must_use]
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Generate a batch of display-formatted backup codes (`ABCD-EF23`).
#[must_use]
pub fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::rng();
    (0..BACKUP_CODE_COUNT)
        .map(|_| {
            let mut raw = [0u8; BACKUP_CODE_LEN];
            rng.fill_bytes(&mut raw);

            let mut code = String::with_capacity(BACKUP_CODE_LEN + 1);
            for (i, byte) in raw.iter().enumerate() {
                if i > 0 && i % BACKUP_CODE_GROUP == 0 {
                    code.push('-');
                }
                let idx = usize::from(*byte) % BACKUP_CODE_ALPHABET.len();
                code.push(char::from(BACKUP_CODE_ALPHABET[idx]));
            }
            code
        })
        .collect()
}

/// Canonical form of user-entered backup code, or `None` if it cannot be one.
///
/// Dashes and spaces are ignored and case is folded.
#[must_use]
pub fn normalize_backup_code(input: &str) -> Option<String> {
    let normalized: String = input
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    (normalized.len() == BACKUP_CODE_LEN
        && normalized.bytes().all(|b| BACKUP_CODE_ALPHABET.contains(&b)))
    .then_some(normalized)
}

/// Digest stored for a backup code. Accepts either form.
#[must_use]
pub fn backup_code_hash(code: &str) -> Option<String> {
    normalize_backup_code(code).map(|c| sha256_hex(&c))
}

/// A random reset token as 64 hex characters.
#[must_use]
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
