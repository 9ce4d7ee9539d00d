//! Default rule-based segmenter: sentence boundaries and person-name candidates.

use mediscribe_core::{EntitySpan, PERSON, Segmentation, Sentence, TextSegmenter, TextSpan};
use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::tokens::{Token, tokenize};

/// Titles and roles stripped from the front of a capitalized run.
static TITLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["patient", "doctor", "dr", "mr", "mrs", "ms", "miss", "nurse"]
        .into_iter()
        .collect()
});

/// Capitalized words that never belong to a person name.
static NON_NAME_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "also",
        "allergies",
        "allergy",
        "blood",
        "diagnosis",
        "follow",
        "good",
        "hello",
        "morning",
        "no",
        "ordered",
        "plan",
        "prescribed",
        "pressure",
        "suspected",
        "temperature",
        "thanks",
        "the",
        "treatment",
    ]
    .into_iter()
    .collect()
});

/// Splits sentences on terminal punctuation and blank lines, and proposes
/// runs of Capitalized words as person names.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSegmenter;

impl RuleSegmenter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Sentences in document order, trimmed, with offsets into `text`.
    #[must_use]
    pub fn sentences(text: &str) -> Vec<Sentence> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let (pos, c) = chars[i];
            if matches!(c, '.' | '!' | '?') {
                let mut j = i + 1;
                while j < chars.len() && matches!(chars[j].1, '.' | '!' | '?') {
                    j += 1;
                }
                if j == chars.len() || chars[j].1.is_whitespace() {
                    let end = chars.get(j).map_or(text.len(), |&(p, _)| p);
                    push_sentence(&mut sentences, text, start, end);
                    start = end;
                    i = j;
                    continue;
                }
            } else if c == '\n' {
                let mut j = i + 1;
                while j < chars.len() && chars[j].1.is_whitespace() && chars[j].1 != '\n' {
                    j += 1;
                }
                if j < chars.len() && chars[j].1 == '\n' {
                    push_sentence(&mut sentences, text, start, pos);
                    start = chars[j].0;
                    i = j;
                    continue;
                }
            }
            i += 1;
        }
        push_sentence(&mut sentences, text, start, text.len());

        sentences
    }

    /// Person-name candidates: two or more Capitalized words separated only
    /// by spaces, minus leading titles, skipping runs with clinical words.
    #[must_use]
    pub fn person_candidates(text: &str) -> Vec<TextSpan> {
        let tokens = tokenize(text);
        let mut candidates = Vec::new();
        let mut run: Vec<&Token> = Vec::new();

        for token in &tokens {
            let joins_run = run.last().is_some_and(|prev| {
                text.get(prev.end..token.start)
                    .is_some_and(|gap| !gap.is_empty() && gap.chars().all(|c| c == ' ' || c == '\t'))
            });
            if !token.is_capitalized(text) {
                flush_run(&mut candidates, text, &run);
                run.clear();
                continue;
            }
            if !joins_run {
                flush_run(&mut candidates, text, &run);
                run.clear();
            }
            run.push(token);
        }
        flush_run(&mut candidates, text, &run);

        candidates
    }
}

fn push_sentence(sentences: &mut Vec<Sentence>, text: &str, start: usize, end: usize) {
    if let Some(span) = TextSpan::trimmed(text, start, end) {
        sentences.push(Sentence {
            text: span.text,
            start: span.start,
            end: span.end,
        });
    }
}

fn flush_run(candidates: &mut Vec<TextSpan>, text: &str, run: &[&Token]) {
    if run.len() < 2 {
        return;
    }
    let first_name = run
        .iter()
        .position(|t| !TITLES.contains(t.lower.as_str()))
        .unwrap_or(run.len());
    let name = &run[first_name..];
    if name.is_empty() || name.iter().any(|t| NON_NAME_WORDS.contains(t.lower.as_str())) {
        return;
    }
    if let (Some(first), Some(last)) = (name.first(), name.last()) {
        if let Some(span) = TextSpan::trimmed(text, first.start, last.end) {
            candidates.push(span);
        }
    }
}

impl TextSegmenter for RuleSegmenter {
    fn segment(&self, text: &str) -> anyhow::Result<Segmentation> {
        let entities = Self::person_candidates(text)
            .into_iter()
            .map(|span| EntitySpan {
                label: PERSON.to_string(),
                span,
            })
            .collect();

        Ok(Segmentation {
            sentences: Self::sentences(text),
            entities,
        })
    }
}
