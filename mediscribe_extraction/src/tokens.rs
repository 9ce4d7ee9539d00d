//! Offset-preserving tokenizer shared by the segmenter and the pattern matcher.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Spelled-out numbers that count as number-like tokens.
static NUMBER_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "eleven", "twelve", "twenty", "thirty", "forty", "fifty", "hundred",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Number,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub lower: String,
}

impl Token {
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or_default()
    }

    /// Digits, decimals and spelled-out numbers.
    #[must_use]
    pub fn like_num(&self) -> bool {
        self.kind == TokenKind::Number
            || (self.kind == TokenKind::Word && NUMBER_WORDS.contains(self.lower.as_str()))
    }

    #[must_use]
    pub fn is_punct(&self) -> bool {
        self.kind == TokenKind::Punct
    }

    /// A word shaped like `Name`: one uppercase letter then lowercase
    /// letters, in any script.
    #[must_use]
    pub fn is_capitalized(&self, source: &str) -> bool {
        let mut chars = self.text(source).chars();
        chars.next().is_some_and(char::is_uppercase)
            && chars.clone().next().is_some()
            && chars.all(char::is_lowercase)
    }
}

/// Split `text` into words, numbers and single-character punctuation.
///
/// Letter/digit boundaries split tokens, so `500mg` yields `500` and `mg`.
/// A dot between digits stays inside the number.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }

        let mut end = start + c.len_utf8();
        let kind = if c.is_ascii_digit() {
            let mut seen_dot = false;
            while let Some(&(i, d)) = chars.peek() {
                let decimal_point = d == '.'
                    && !seen_dot
                    && text
                        .get(i + 1..)
                        .is_some_and(|rest| rest.starts_with(|n: char| n.is_ascii_digit()));
                if !(d.is_ascii_digit() || decimal_point) {
                    break;
                }
                seen_dot |= decimal_point;
                end = i + d.len_utf8();
                chars.next();
            }
            TokenKind::Number
        } else if c.is_alphabetic() {
            while let Some(&(i, d)) = chars.peek() {
                if !d.is_alphabetic() {
                    break;
                }
                end = i + d.len_utf8();
                chars.next();
            }
            TokenKind::Word
        } else {
            TokenKind::Punct
        };

        tokens.push(Token {
            kind,
            start,
            end,
            lower: text[start..end].to_lowercase(),
        });
    }

    tokens
}
