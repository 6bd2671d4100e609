//! Shared utility functions

/// Shorten a wire line for logging, keeping it on a char boundary.
///
/// Documents are pushed as single lines that can be megabytes long; debug
/// logs only need the command head.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let suffix = "...";
    let mut end = max_len.saturating_sub(suffix.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &s[..end], suffix)
}
