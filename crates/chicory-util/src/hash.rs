/// Content hash of a module body, hex-encoded BLAKE3.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
