/// Chunk size used when no other is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Split `s` into pieces of at most `max_bytes` bytes, never splitting a
/// UTF-8 character.
///
/// Empty input yields a single empty chunk so that empty files still round
/// trip through the store. A character wider than `max_bytes` gets a chunk
/// of its own.
pub fn chunk_utf8(s: &str, max_bytes: usize) -> Vec<String> {
    if s.is_empty() {
        return vec![String::new()];
    }
    let max_bytes = max_bytes.max(1);
    let mut chunks = Vec::with_capacity(s.len() / max_bytes + 1);
    let mut start = 0;
    while start < s.len() {
        let mut end = (start + max_bytes).min(s.len());
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // single character wider than the limit
            end = start
                + s[start..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
        }
        chunks.push(s[start..end].to_string());
        start = end;
    }
    chunks
}
