//! Cleanup of raw extracted text before chunking.

/// Returns `true` for characters treated as word separators.
///
/// This is Unicode whitespace plus the ASCII information separators
/// (`\x1c`..=`\x1f`) that PDF extraction tends to leave behind.
#[must_use]
pub fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Splits text into whitespace-delimited word tokens.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_separator).filter(|w| !w.is_empty())
}

/// Replaces null bytes with spaces, collapses every whitespace run into a
/// single space and trims both ends. Total over any input.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split(|c: char| c == '\0' || is_separator(c)) {
        if word.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_null_bytes_become_separators() {
        assert_eq!(normalize_text("alpha\0beta"), "alpha beta");
        assert_eq!(normalize_text("\0\0"), "");
    }

    #[test]
    fn test_collapses_mixed_whitespace() {
        let raw = "  Page 1\n\n\tIntro\r\n  text \u{a0} here  ";
        assert_eq!(normalize_text(raw), "Page 1 Intro text here");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \n\t "), "");
    }

    #[test]
    fn test_information_separators_are_whitespace() {
        assert_eq!(normalize_text("a\u{1f}b\u{1c}c"), "a b c");
    }

    #[test]
    fn test_words_skips_empty_tokens() {
        let tokens: Vec<&str> = words("  one\ntwo   three ").collect();
        assert_eq!(tokens, vec!["one", "two", "three"]);
    }

    proptest! {
        #[test]
        fn proptest_normalize_is_idempotent(raw in "(?s).{0,200}") {
            let once = normalize_text(&raw);
            prop_assert_eq!(normalize_text(&once), once.clone());
        }

        #[test]
        fn proptest_normalized_text_is_single_line(raw in "[a-z \\n\\t\\x00\\r]{0,120}") {
            let out = normalize_text(&raw);
            prop_assert!(!out.contains('\n'));
            prop_assert!(!out.contains('\0'));
            prop_assert!(!out.contains("  "));
            prop_assert_eq!(out.trim(), out.as_str());
        }
    }
}
