//! Signup confirmation codes.
//!
//! A code is an HMAC over the user's persisted identity state plus an issue
//! timestamp: `<timestamp-base36>-<signature-hex>`. Nothing is stored server
//! side; a code stops verifying when it ages past the TTL or when any bound
//! field changes (email, role, `last_login`). Since a successful token
//! exchange updates `last_login`, a used code cannot be replayed.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::entities::users;

type HmacSha256 = Hmac<Sha256>;

/// Hex chars of the HMAC kept in the code. 20 nibbles = 80 bits, plenty for
/// a short-lived single-purpose proof.
const SIGNATURE_LEN: usize = 20;

pub struct ConfirmationCodes {
    secret: Vec<u8>,
    ttl_seconds: i64,
}

impl ConfirmationCodes {
    #[must_use]
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_seconds,
        }
    }

    #[must_use]
    pub fn issue(&self, user: &users::Model) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        format!(
            "{}-{}",
            to_base36(timestamp),
            self.signature(user, timestamp)
        )
    }

    #[must_use]
    pub fn verify(&self, user: &users::Model, code: &str) -> bool {
        let Some((ts_part, sig_part)) = code.split_once('-') else {
            return false;
        };
        let Some(timestamp) = from_base36(ts_part) else {
            return false;
        };

        let age = chrono::Utc::now().timestamp() - timestamp;
        if age < 0 || age > self.ttl_seconds {
            return false;
        }

        constant_time_eq(self.signature(user, timestamp).as_bytes(), sig_part.as_bytes())
    }

    fn signature(&self, user: &users::Model, timestamp: i64) -> String {
        let state = format!(
            "{}\x00{}\x00{}\x00{}\x00{}\x00{}",
            user.id,
            user.username,
            user.email,
            user.role,
            user.last_login.as_deref().unwrap_or(""),
            timestamp,
        );

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(state.as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            use std::fmt::Write;
            let _ = write!(hex, "{byte:02x}");
        }
        hex.truncate(SIGNATURE_LEN);
        hex
    }
}

fn to_base36(mut value: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}

fn from_base36(input: &str) -> Option<i64> {
    if input.is_empty() {
        return None;
    }
    let mut value: i64 = 0;
    for c in input.bytes() {
        let digit = match c {
            b'0'..=b'9' => i64::from(c - b'0'),
            b'a'..=b'z' => i64::from(c - b'a') + 10,
            _ => return None,
        };
        value = value.checked_mul(36)?.checked_add(digit)?;
    }
    Some(value)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
