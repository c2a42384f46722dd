//! Identifier and token generation.
//!
//! None of these tokens are verified anywhere; they only need to be unique
//! enough for a demo deployment and to look the part.

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut n: u64) -> String {
  if n == 0 {
    return "0".to_owned();
  }
  let mut digits = Vec::new();
  while n > 0 {
    digits.push(BASE36[(n % 36) as usize]);
    n /= 36;
  }
  digits.reverse();
  String::from_utf8_lossy(&digits).into_owned()
}

/// Nine random base-36 characters.
fn random_base36() -> String {
  let mut n = OsRng.next_u64();
  (0..9)
    .map(|_| {
      let c = BASE36[(n % 36) as usize] as char;
      n /= 36;
      c
    })
    .collect()
}

fn millis(at: DateTime<Utc>) -> u64 { at.timestamp_millis().max(0) as u64 }

/// Id minted by a reporting client: `id_<random><millis base36>`.
pub fn client_alert_id(at: DateTime<Utc>) -> String {
  format!("id_{}{}", random_base36(), to_base36(millis(at)))
}

/// Id minted by the relay for submissions that carry none:
/// `alert_<millis>_<random>`.
pub fn relay_alert_id(at: DateTime<Utc>) -> String {
  format!("alert_{}_{}", millis(at), random_base36())
}

/// Synthetic identity token: `0x` followed by 40 hex digits.
pub fn identity_token() -> String {
  let mut bytes = [0u8; 20];
  OsRng.fill_bytes(&mut bytes);
  format!("0x{}", hex::encode(bytes))
}

/// Decorative "transaction hash" for an alert: `0x` followed by the 64 hex
/// digits of a salted SHA-256 over the alert id and timestamp.
pub fn transaction_hash(alert_id: &str, at: DateTime<Utc>) -> String {
  let mut salt = [0u8; 16];
  OsRng.fill_bytes(&mut salt);

  let mut hasher = Sha256::new();
  hasher.update(alert_id.as_bytes());
  hasher.update(at.timestamp_micros().to_le_bytes());
  hasher.update(salt);
  format!("0x{}", hex::encode(hasher.finalize()))
}
