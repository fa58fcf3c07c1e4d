//! Thin wrapper around the `base64` crate pinning the engine INDI
//! wire data uses: standard alphabet, with padding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded.as_bytes())
}
