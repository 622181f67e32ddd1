use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Compute the IPN signature for a raw request body: hex-encoded HMAC-SHA512 over the exact bytes.
pub fn ipn_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    to_hex(&mac.finalize().into_bytes())
}

/// Check a signature header against the digest of the raw body.
///
/// An empty secret always fails verification. The body must not be parsed before this returns true.
pub fn verify_ipn_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    if secret.is_empty() || signature.is_empty() {
        return false;
    }
    ipn_signature(secret, body) == signature.trim().to_lowercase()
}

/// Substitute the literal `{{orderId}}` placeholder in a redirect template with the
/// percent-encoded order id.
pub fn resolve_url_template(template: &str, order_id: &str) -> String {
    template.replace("{{orderId}}", &encode_url_component(order_id))
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(2 * bytes.len()), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

fn encode_url_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
