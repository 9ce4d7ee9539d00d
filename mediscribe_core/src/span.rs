//! Extraction evidence: spans, pattern categories and text segmentation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Entity label carried by person-name candidates from a segmenter.
pub const PERSON: &str = "PERSON";

/// A substring of the transcript plus its byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    /// The matched text.
    pub text: String,

    /// Byte offset of the first character in the source text.
    pub start: usize,

    /// Byte offset one past the last character in the source text.
    pub end: usize,

    /// Surrounding text the match was found in, when a detector records it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl TextSpan {
    #[must_use]
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            context: None,
        }
    }

    /// Build a span from a byte range of `source`, trimming surrounding
    /// whitespace and adjusting the offsets to match.
    ///
    /// Returns `None` when the range is empty after trimming or does not
    /// fall on character boundaries.
    #[must_use]
    pub fn trimmed(source: &str, start: usize, end: usize) -> Option<Self> {
        let raw = source.get(start..end)?;
        let leading = raw.len() - raw.trim_start().len();
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        let start = start + leading;
        Some(Self::new(text, start, start + text.len()))
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Category tag attached to spans emitted by the pattern matcher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Category {
    /// Temperatures, blood pressure readings, heart rate mentions.
    VitalSign = 0,
    /// Amounts with a unit and administration frequencies.
    Dosage = 1,
}

impl Category {
    /// Returns the string representation of this category.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::VitalSign => "vital_sign",
            Self::Dosage => "dosage",
        }
    }
}

impl FromStr for Category {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vital_sign" | "vital_signs" => Ok(Self::VitalSign),
            "dosage" | "dosages" => Ok(Self::Dosage),
            _ => Err("unknown pattern category"),
        }
    }
}

/// One sentence of a segmented transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A labelled entity candidate produced by a segmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    pub label: String,
    pub span: TextSpan,
}

/// Output of a [`crate::TextSegmenter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub sentences: Vec<Sentence>,
    pub entities: Vec<EntitySpan>,
}

impl Segmentation {
    /// Treat the whole text as a single sentence with no entity candidates.
    #[must_use]
    pub fn whole(text: &str) -> Self {
        let sentences = TextSpan::trimmed(text, 0, text.len())
            .map(|span| Sentence {
                text: span.text,
                start: span.start,
                end: span.end,
            })
            .into_iter()
            .collect();
        Self {
            sentences,
            entities: Vec::new(),
        }
    }

    /// Person-name candidates in document order.
    pub fn persons(&self) -> impl Iterator<Item = &TextSpan> {
        self.entities
            .iter()
            .filter(|e| e.label == PERSON)
            .map(|e| &e.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_conversion() {
        assert_eq!(Category::VitalSign.as_str(), "vital_sign");
        assert_eq!(Category::from_str("DOSAGE"), Ok(Category::Dosage));
        assert_eq!(Category::from_str("vital_signs"), Ok(Category::VitalSign));
        assert!(Category::from_str("allergy").is_err());
    }

    #[test]
    fn test_trimmed_span_adjusts_offsets() {
        let source = "Diagnosis:   flu  .";
        let span = TextSpan::trimmed(source, 10, 18);
        assert_eq!(span, Some(TextSpan::new("flu", 13, 16)));
        assert!(TextSpan::trimmed(source, 10, 13).is_none());
    }

    #[test]
    fn test_whole_segmentation() {
        let seg = Segmentation::whole("  one sentence only ");
        assert_eq!(seg.sentences.len(), 1);
        assert_eq!(seg.sentences[0].text, "one sentence only");
        assert_eq!(seg.sentences[0].start, 2);
        assert!(Segmentation::whole("   ").sentences.is_empty());
    }
}
