use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::*;

// Accepts non-canonical final symbols the way Node's Buffer does
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Decode Gmail's base64url data into raw bytes
///
/// Gmail and Pub/Sub drop the trailing `=` padding, so it is restored before
/// decoding. Both the URL-safe and the standard alphabet are accepted.
pub fn decode_bytes(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let padding = (4 - data.len() % 4) % 4;

    let mut normalized = String::with_capacity(data.len() + padding);
    for c in data.chars() {
        normalized.push(match c {
            '-' => '+',
            '_' => '/',
            other => other,
        });
    }
    normalized.extend(std::iter::repeat_n('=', padding));

    LENIENT.decode(normalized.as_bytes())
}

/// Decode base64url body data to text
///
/// Never fails: empty or malformed input yields an empty string.
pub fn decode(data: &str) -> String {
    if data.is_empty() {
        return String::new();
    }

    match decode_bytes(data) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}
