//! Normalization of field candidates before a record is built.

use mediscribe_core::TextSpan;
use std::collections::HashSet;

use crate::fields::FieldCandidates;

/// Keep the first occurrence of each case-insensitively distinct text,
/// preserving order.
#[must_use]
pub fn dedup_spans(spans: Vec<TextSpan>) -> Vec<TextSpan> {
    let mut seen = HashSet::new();
    spans
        .into_iter()
        .filter(|span| !span.text.is_empty() && seen.insert(span.text.to_lowercase()))
        .collect()
}

/// Dedup every list field and cut scalar fields down to their first
/// candidate. Applying it twice gives the same result as applying it once.
#[must_use]
pub fn normalize(mut candidates: FieldCandidates) -> FieldCandidates {
    let mut normalized = FieldCandidates::default();
    for (field, spans) in candidates.drain() {
        let spans = if field.is_scalar() {
            spans.into_iter().take(1).collect()
        } else {
            dedup_spans(spans)
        };
        normalized.set(field, spans);
    }
    normalized
}
