//! Binary content detection

/// True when the first `probe_bytes` of `content` contain a NUL byte
pub fn looks_binary(content: &[u8], probe_bytes: usize) -> bool {
    let end = content.len().min(probe_bytes);
    content[..end].contains(&0)
}
