//! Character-offset helpers.
//!
//! Anchors address a response by `char` position, never by byte, so every
//! slice of response text goes through these helpers.

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Slice `text` between two character offsets.
///
/// Offsets past the end are clamped to the end of the string, and an empty
/// string is returned when `start >= end`.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let start_byte = byte_offset(text, start);
    let end_byte = byte_offset(text, end);
    if start_byte >= end_byte {
        return "";
    }
    &text[start_byte..end_byte]
}

/// Slice `text` from a character offset to the end.
pub fn char_tail(text: &str, start: usize) -> &str {
    &text[byte_offset(text, start)..]
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_by_character_not_byte() {
        let text = "héllo wörld";
        assert_eq!(char_len(text), 11);
        assert_eq!(char_slice(text, 1, 5), "éllo");
        assert_eq!(char_slice(text, 6, 11), "wörld");
        assert_eq!(char_tail(text, 7), "örld");
    }

    #[test]
    fn out_of_range_offsets_clamp() {
        assert_eq!(char_slice("abc", 1, 10), "bc");
        assert_eq!(char_slice("abc", 5, 10), "");
        assert_eq!(char_slice("abc", 2, 1), "");
        assert_eq!(char_tail("abc", 3), "");
    }
}
