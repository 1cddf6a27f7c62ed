//! Word-versus-paragraph heuristic.
//!
//! A "word" is a single Latin-alphabet token, optionally with inner hyphens or
//! apostrophes, at most [`MAX_WORD_LEN`] characters long. This is a cheap
//! heuristic to decide between a dictionary lookup and a plain translation,
//! not a linguistic definition: "e-mail" is a word, "naïve" and "3D" are not.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_WORD_LEN: usize = 30;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z](?:[A-Za-z'-]*[A-Za-z])?$").expect("valid word pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Word,
    Paragraph,
}

impl TextKind {
    pub fn is_word(self) -> bool {
        self == TextKind::Word
    }
}

pub fn classify(text: &str) -> TextKind {
    let trimmed = text.trim();
    if trimmed.chars().any(char::is_whitespace) {
        return TextKind::Paragraph;
    }
    if trimmed.chars().count() <= MAX_WORD_LEN && WORD_RE.is_match(trimmed) {
        TextKind::Word
    } else {
        TextKind::Paragraph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tokens_are_words() {
        for w in ["hello", "don't", "e-mail", "a", "Rust", "mother-in-law"] {
            assert_eq!(classify(w), TextKind::Word, "{w}");
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(classify("  cat\n"), TextKind::Word);
    }

    #[test]
    fn anything_with_inner_whitespace_is_a_paragraph() {
        assert_eq!(classify("hello world"), TextKind::Paragraph);
        assert_eq!(classify("hello\tworld"), TextKind::Paragraph);
    }

    #[test]
    fn non_alphabetic_tokens_are_paragraphs() {
        for t in ["3D", "-dash", "dash-", "it's'", "naïve", "你好", "hello!", ""] {
            assert_eq!(classify(t), TextKind::Paragraph, "{t}");
        }
    }

    #[test]
    fn length_limit() {
        let thirty = "a".repeat(30);
        let thirty_one = "a".repeat(31);
        assert_eq!(classify(&thirty), TextKind::Word);
        assert_eq!(classify(&thirty_one), TextKind::Paragraph);
    }
}
