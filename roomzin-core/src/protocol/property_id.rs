//! Decoding of the server's 16-byte opaque property identifier.

use uuid::Uuid;

/// Marker at byte 6 indicating the short-string encoding.
const SHORT_STRING_MARKER: u8 = 0xF0;

/// Decodes a property id from its 16-byte wire form.
///
/// If byte 6 equals `0xF0`, the id is a short string split around the
/// marker: bytes `[0..6)` and `[7..16)`, each up to the first NUL, are
/// concatenated. Otherwise the high nibble of byte 6 is interpreted as a
/// UUID version; versions 1–5 and 7 render the 16 bytes as a canonical
/// UUID string. Any other shape decodes to the empty string.
pub fn decode_property_id(data: &[u8]) -> String {
    if data.len() < 7 {
        return String::new();
    }

    if data[6] == SHORT_STRING_MARKER {
        let left = data[..6].split(|b| *b == 0).next().unwrap_or(&[]);
        let tail = &data[7..data.len().min(16)];
        let right = tail.split(|b| *b == 0).next().unwrap_or(&[]);

        let mut out = Vec::with_capacity(left.len() + right.len());
        out.extend_from_slice(left);
        out.extend_from_slice(right);
        return String::from_utf8_lossy(&out).into_owned();
    }

    let version = data[6] >> 4;
    if matches!(version, 1..=5 | 7) {
        let mut bytes = [0u8; 16];
        let n = data.len().min(16);
        bytes[..n].copy_from_slice(&data[..n]);
        return Uuid::from_bytes(bytes).to_string();
    }

    String::new()
}
