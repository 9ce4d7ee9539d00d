//! Field detectors and the ordered chains that run them.
//!
//! Each canonical field owns one [`DetectorChain`]. Scalar fields use
//! [`ChainPolicy::FirstMatch`]: detectors are tried in order and the first
//! one that finds anything wins. List fields use [`ChainPolicy::Union`]:
//! every detector runs and results are concatenated in detector order.
//! A detector that fails is logged and treated as having found nothing.

use mediscribe_core::{Category, Segmentation, TextSpan};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::fields::Field;
use crate::patterns::PatternMatch;

/// Everything a detector may look at for one transcript.
#[derive(Debug, Clone, Copy)]
pub struct DetectionInput<'a> {
    pub text: &'a str,
    pub segmentation: &'a Segmentation,
    pub matches: &'a [PatternMatch],
}

/// A detector's runtime failure. Never escapes its chain.
#[derive(Debug, Error)]
#[error("detector {detector} failed: {message}")]
pub struct DetectorError {
    pub detector: String,
    pub message: String,
}

/// One named strategy that proposes candidates for a field.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, input: &DetectionInput<'_>) -> Result<Vec<TextSpan>, DetectorError>;
}

/// Person-name candidates from the segmenter, minus role words.
#[derive(Debug, Clone)]
pub struct PersonEntities {
    role_words: HashSet<String>,
}

impl PersonEntities {
    #[must_use]
    pub fn new(role_words: &[String]) -> Self {
        Self {
            role_words: role_words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }
}

impl Detector for PersonEntities {
    fn name(&self) -> &str {
        "person_entities"
    }

    fn detect(&self, input: &DetectionInput<'_>) -> Result<Vec<TextSpan>, DetectorError> {
        Ok(input
            .segmentation
            .persons()
            .filter(|span| !self.role_words.contains(&span.text.to_lowercase()))
            .cloned()
            .collect())
    }
}

/// Fixed-vocabulary scan. Each keyword present in the text contributes the
/// keyword itself with its first containing sentence as context.
#[derive(Debug, Clone)]
pub struct KeywordScan {
    keywords: Vec<String>,
}

impl KeywordScan {
    #[must_use]
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_ascii_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

impl Detector for KeywordScan {
    fn name(&self) -> &str {
        "symptom_keywords"
    }

    fn detect(&self, input: &DetectionInput<'_>) -> Result<Vec<TextSpan>, DetectorError> {
        let lowered: Vec<String> = input
            .segmentation
            .sentences
            .iter()
            .map(|s| s.text.to_ascii_lowercase())
            .collect();

        let spans = self
            .keywords
            .iter()
            .filter_map(|keyword| {
                lowered.iter().enumerate().find_map(|(i, sentence)| {
                    let offset = sentence.find(keyword.as_str())?;
                    let owner = &input.segmentation.sentences[i];
                    let start = owner.start + offset;
                    Some(
                        TextSpan::new(keyword.clone(), start, start + keyword.len())
                            .with_context(owner.text.clone()),
                    )
                })
            })
            .collect();
        Ok(spans)
    }
}

/// Pattern matcher output for one category.
#[derive(Debug, Clone, Copy)]
pub struct CategorySpans(pub Category);

impl Detector for CategorySpans {
    fn name(&self) -> &str {
        match self.0 {
            Category::VitalSign => "vital_sign_patterns",
            Category::Dosage => "dosage_patterns",
        }
    }

    fn detect(&self, input: &DetectionInput<'_>) -> Result<Vec<TextSpan>, DetectorError> {
        Ok(input
            .matches
            .iter()
            .filter(|m| m.category == self.0)
            .map(|m| m.span.clone())
            .collect())
    }
}

/// How a chain combines its detectors' results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPolicy {
    /// The first detector with a non-empty result wins; later ones are skipped.
    FirstMatch,
    /// All detectors run; results are concatenated in detector order.
    Union,
}

/// Ordered detectors for one field.
pub struct DetectorChain {
    field: Field,
    policy: ChainPolicy,
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorChain {
    /// Empty chain with the policy implied by the field's arity.
    #[must_use]
    pub fn for_field(field: Field) -> Self {
        let policy = if field.is_scalar() {
            ChainPolicy::FirstMatch
        } else {
            ChainPolicy::Union
        };
        Self {
            field,
            policy,
            detectors: Vec::new(),
        }
    }

    #[must_use]
    pub const fn field(&self) -> Field {
        self.field
    }

    #[must_use]
    pub const fn policy(&self) -> ChainPolicy {
        self.policy
    }

    /// Detector names in precedence order.
    #[must_use]
    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn push(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    /// Run the chain. Scalar chains return at most one span.
    #[must_use]
    pub fn run(&self, input: &DetectionInput<'_>) -> Vec<TextSpan> {
        let mut found = Vec::new();

        for detector in &self.detectors {
            let spans = match detector.detect(input) {
                Ok(spans) => spans,
                Err(e) => {
                    warn!(
                        "Field {} degraded, skipping detector: {e}",
                        self.field.as_str()
                    );
                    continue;
                }
            };
            if spans.is_empty() {
                continue;
            }

            match self.policy {
                ChainPolicy::FirstMatch => {
                    debug!(
                        "Field {} matched by {}",
                        self.field.as_str(),
                        detector.name()
                    );
                    return spans.into_iter().take(1).collect();
                }
                ChainPolicy::Union => found.extend(spans),
            }
        }

        found
    }
}

impl std::fmt::Debug for DetectorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorChain")
            .field("field", &self.field)
            .field("policy", &self.policy)
            .field("detectors", &self.detector_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediscribe_core::{EntitySpan, PERSON, Sentence};

    struct Fixed(&'static str, Vec<&'static str>);

    impl Detector for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn detect(&self, _input: &DetectionInput<'_>) -> Result<Vec<TextSpan>, DetectorError> {
            Ok(self.1.iter().map(|t| TextSpan::new(*t, 0, t.len())).collect())
        }
    }

    struct Failing;

    impl Detector for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn detect(&self, _input: &DetectionInput<'_>) -> Result<Vec<TextSpan>, DetectorError> {
            Err(DetectorError {
                detector: "failing".to_string(),
                message: "boom".to_string(),
            })
        }
    }

    fn texts(spans: Vec<TextSpan>) -> Vec<String> {
        spans.into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn test_first_match_skips_later_detectors() {
        let seg = Segmentation::default();
        let input = DetectionInput {
            text: "",
            segmentation: &seg,
            matches: &[],
        };
        let mut chain = DetectorChain::for_field(Field::PatientName);
        chain.push(Box::new(Fixed("empty", vec![])));
        chain.push(Box::new(Fixed("second", vec!["Ann Lee", "Bob Ray"])));
        chain.push(Box::new(Fixed("third", vec!["Cy Dunn"])));

        assert_eq!(chain.policy(), ChainPolicy::FirstMatch);
        assert_eq!(texts(chain.run(&input)), ["Ann Lee"]);
    }

    #[test]
    fn test_union_keeps_detector_order() {
        let seg = Segmentation::default();
        let input = DetectionInput {
            text: "",
            segmentation: &seg,
            matches: &[],
        };
        let mut chain = DetectorChain::for_field(Field::Symptoms);
        chain.push(Box::new(Fixed("cue", vec!["sore throat"])));
        chain.push(Box::new(Failing));
        chain.push(Box::new(Fixed("keywords", vec!["cough", "fever"])));

        assert_eq!(chain.policy(), ChainPolicy::Union);
        assert_eq!(chain.detector_names(), ["cue", "failing", "keywords"]);
        assert_eq!(texts(chain.run(&input)), ["sore throat", "cough", "fever"]);
    }

    #[test]
    fn test_failing_detector_degrades_to_empty() {
        let seg = Segmentation::default();
        let input = DetectionInput {
            text: "",
            segmentation: &seg,
            matches: &[],
        };
        let mut chain = DetectorChain::for_field(Field::Age);
        chain.push(Box::new(Failing));
        assert!(chain.run(&input).is_empty());
    }

    #[test]
    fn test_person_entities_exclude_role_words() {
        let seg = Segmentation {
            sentences: vec![],
            entities: vec![
                EntitySpan {
                    label: PERSON.to_string(),
                    span: TextSpan::new("Doctor", 0, 6),
                },
                EntitySpan {
                    label: "ORG".to_string(),
                    span: TextSpan::new("City Clinic", 7, 18),
                },
                EntitySpan {
                    label: PERSON.to_string(),
                    span: TextSpan::new("Ravi Patel", 20, 30),
                },
            ],
        };
        let input = DetectionInput {
            text: "",
            segmentation: &seg,
            matches: &[],
        };
        let detector = PersonEntities::new(&["doctor".to_string(), "dr".to_string()]);
        assert_eq!(texts(detector.detect(&input).unwrap_or_default()), ["Ravi Patel"]);
    }

    #[test]
    fn test_keyword_scan_records_sentence_context() {
        let text = "Mild headache. Persistent Cough at night.";
        let seg = Segmentation {
            sentences: vec![
                Sentence {
                    text: "Mild headache.".to_string(),
                    start: 0,
                    end: 14,
                },
                Sentence {
                    text: "Persistent Cough at night.".to_string(),
                    start: 15,
                    end: 41,
                },
            ],
            entities: vec![],
        };
        let input = DetectionInput {
            text,
            segmentation: &seg,
            matches: &[],
        };
        let detector = KeywordScan::new(&["cough".to_string(), "fever".to_string()]);
        let spans = detector.detect(&input).unwrap_or_default();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "cough");
        assert_eq!(&text[spans[0].start..spans[0].end], "Cough");
        assert_eq!(spans[0].context.as_deref(), Some("Persistent Cough at night."));
    }

    #[test]
    fn test_category_spans_filter() {
        let seg = Segmentation::default();
        let matches = vec![
            PatternMatch {
                category: Category::Dosage,
                rule: "amount_unit".to_string(),
                span: TextSpan::new("500mg", 0, 5),
            },
            PatternMatch {
                category: Category::VitalSign,
                rule: "pressure_ratio".to_string(),
                span: TextSpan::new("120/80", 6, 12),
            },
        ];
        let input = DetectionInput {
            text: "",
            segmentation: &seg,
            matches: &matches,
        };
        let spans = CategorySpans(Category::VitalSign)
            .detect(&input)
            .unwrap_or_default();
        assert_eq!(texts(spans), ["120/80"]);
    }
}
