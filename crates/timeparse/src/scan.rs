//! Shared low-level scanning helpers for the grammars.

/// Returns the end offset of the ASCII digit run starting at `pos`, or
/// `None` if there is no digit there.
pub(crate) fn digits(input: &str, pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut end = pos;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    (end > pos).then_some(end)
}

/// Skips ASCII whitespace starting at `pos`, returning the new offset.
pub(crate) fn skip_ws(input: &str, pos: usize) -> usize {
    let bytes = input.as_bytes();
    let mut end = pos;
    while end < bytes.len() && bytes[end].is_ascii_whitespace() {
        end += 1;
    }
    end
}

/// True if `pos` sits on a word boundary, i.e. the next character is not a
/// letter, digit, or underscore. End of input counts as a boundary.
pub(crate) fn at_word_boundary(input: &str, pos: usize) -> bool {
    match input[pos..].chars().next() {
        None => true,
        Some(c) => !(c.is_alphanumeric() || c == '_'),
    }
}

/// Matches `token` case-insensitively at `pos`, returning the end offset.
pub(crate) fn keyword(input: &str, pos: usize, token: &str) -> Option<usize> {
    let end = pos + token.len();
    if input.len() >= end
        && input.is_char_boundary(end)
        && input[pos..end].eq_ignore_ascii_case(token)
    {
        Some(end)
    } else {
        None
    }
}
