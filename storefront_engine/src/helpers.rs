use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

use crate::db_types::OrderId;

/// Generate a new order id: a five-digit code with a `#` prefix.
pub fn new_order_id() -> OrderId {
    let code = thread_rng().gen_range(10_000..100_000);
    OrderId(format!("#{code}"))
}

/// Generate an opaque entity id (users, chats, messages, activity entries).
pub fn new_entity_id() -> String {
    random_hex(16)
}

/// Generate a session bearer token. Twice the entropy of an entity id.
pub fn new_session_token() -> String {
    random_hex(32)
}

/// Hex-encoded SHA-256 digest, used for password hashes.
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    to_hex(&digest)
}

/// Title-case an identifier by splitting on non-alphanumeric runs: `nowpayments-btc` becomes
/// `Nowpayments Btc`. Used as the label of last resort for unregistered provider keys.
pub fn title_case(value: &str) -> String {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn random_hex(len_bytes: usize) -> String {
    let mut bytes = vec![0u8; len_bytes];
    thread_rng().fill(bytes.as_mut_slice());
    to_hex(&bytes)
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(2 * bytes.len()), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
