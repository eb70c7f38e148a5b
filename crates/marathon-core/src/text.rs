//! UTF-8–safe previews of raw payloads for log fields.

/// Longest prefix of `s` that fits in `max_bytes` without splitting a character.
///
/// Raw event bodies can be arbitrarily large; log lines carry this prefix
/// instead of the full content.
#[inline]
pub fn preview(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
