//! Extraction engine: transcript in, canonical record out.
//!
//! The pipeline is pattern matching, then the per-field detector chains,
//! then normalization, then record assembly. It does no I/O (apart from
//! the explicit file entry point) and holds no mutable state, so one
//! engine can serve concurrent callers.

use mediscribe_core::{
    Category, ExtractedRecord, InputError, RecordMetadata, Segmentation, TextSegmenter,
    Translator,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::builder::build_record;
use crate::dedup::normalize;
use crate::detectors::{
    CategorySpans, DetectionInput, Detector, DetectorChain, KeywordScan, PersonEntities,
};
use crate::fields::{Field, FieldCandidates, FieldRuleDef, default_field_rules};
use crate::input::read_transcript;
use crate::patterns::{PatternDef, PatternMatcher, default_pattern_rules};
use crate::segment::RuleSegmenter;

/// Configuration for the extraction engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Regex field rules; per field, list order is precedence.
    #[serde(default = "default_field_rules")]
    pub field_rules: Vec<FieldRuleDef>,

    /// Extra regular-expression rules for the pattern matcher.
    #[serde(default = "default_pattern_rules")]
    pub pattern_rules: Vec<PatternDef>,

    /// Vocabulary for the symptom keyword scan.
    #[serde(default = "default_symptom_keywords")]
    pub symptom_keywords: Vec<String>,

    /// Person candidates equal to one of these are never patient names.
    #[serde(default = "default_role_words")]
    pub role_words: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            field_rules: default_field_rules(),
            pattern_rules: default_pattern_rules(),
            symptom_keywords: default_symptom_keywords(),
            role_words: default_role_words(),
        }
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

/// Default symptom vocabulary.
#[must_use]
pub fn default_symptom_keywords() -> Vec<String> {
    to_strings(&[
        "cough",
        "fever",
        "pain",
        "headache",
        "nausea",
        "vomiting",
        "dizziness",
        "fatigue",
        "weakness",
        "breathing",
        "chest tightness",
        "sore throat",
        "runny nose",
        "congestion",
        "ache",
        "hurt",
        "sick",
    ])
}

fn default_role_words() -> Vec<String> {
    to_strings(&["doctor", "patient", "dr"])
}

/// Rule-based extractor for clinical transcripts.
pub struct ExtractionEngine {
    segmenter: Arc<dyn TextSegmenter>,
    matcher: PatternMatcher,
    chains: Vec<DetectorChain>,
}

impl ExtractionEngine {
    /// Build the engine. Rules that fail to compile are logged and skipped.
    #[must_use]
    pub fn new(config: &ExtractionConfig) -> Self {
        let mut chains: Vec<DetectorChain> = Field::ALL
            .into_iter()
            .map(DetectorChain::for_field)
            .collect();

        for def in &config.field_rules {
            match def.build() {
                Ok((field, rule)) => chains[field.index()].push(Box::new(rule)),
                Err(e) => warn!("Skipping field rule: {e}"),
            }
        }
        chains[Field::PatientName.index()].push(Box::new(PersonEntities::new(&config.role_words)));
        chains[Field::Symptoms.index()].push(Box::new(KeywordScan::new(&config.symptom_keywords)));
        chains[Field::Dosages.index()].push(Box::new(CategorySpans(Category::Dosage)));
        chains[Field::VitalSigns.index()].push(Box::new(CategorySpans(Category::VitalSign)));

        Self {
            segmenter: Arc::new(RuleSegmenter::new()),
            matcher: PatternMatcher::new(&config.pattern_rules),
            chains,
        }
    }

    /// Create an engine with the default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(&ExtractionConfig::default())
    }

    /// Replace the default segmenter.
    #[must_use]
    pub fn with_segmenter(mut self, segmenter: Arc<dyn TextSegmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Append a detector to the end of a field's chain.
    pub fn add_detector(&mut self, field: Field, detector: Box<dyn Detector>) {
        self.chains[field.index()].push(detector);
    }

    #[must_use]
    pub fn chain(&self, field: Field) -> &DetectorChain {
        &self.chains[field.index()]
    }

    fn segment(&self, text: &str) -> Segmentation {
        self.segmenter.segment(text).unwrap_or_else(|e| {
            warn!("Segmenter failed, treating text as one sentence: {e:#}");
            Segmentation::whole(text)
        })
    }

    /// Raw per-field candidates, before normalization.
    #[must_use]
    pub fn candidates(&self, text: &str) -> FieldCandidates {
        let segmentation = self.segment(text);
        let matches = self.matcher.find(text);
        let input = DetectionInput {
            text,
            segmentation: &segmentation,
            matches: &matches,
        };

        let mut candidates = FieldCandidates::default();
        for chain in &self.chains {
            let spans = chain.run(&input);
            debug!(
                "Field {}: {} candidate(s)",
                chain.field().as_str(),
                spans.len()
            );
            candidates.set(chain.field(), spans);
        }
        candidates
    }

    /// Normalized per-field candidates.
    #[must_use]
    pub fn extract(&self, text: &str) -> FieldCandidates {
        normalize(self.candidates(text))
    }

    /// Extract and assemble a record carrying `metadata`.
    #[must_use]
    pub fn extract_record(&self, text: &str, metadata: RecordMetadata) -> ExtractedRecord {
        build_record(&self.extract(text), text, metadata)
    }

    /// Extract a record with no caller metadata.
    #[must_use]
    pub fn extract_from_text(&self, text: &str) -> ExtractedRecord {
        self.extract_record(text, RecordMetadata::default())
    }

    /// Read a transcript file and extract a record from it.
    ///
    /// # Errors
    /// Returns an [`InputError`] if the file is missing or unreadable.
    pub fn extract_from_file(
        &self,
        path: &Path,
        metadata: RecordMetadata,
    ) -> Result<ExtractedRecord, InputError> {
        let text = read_transcript(path)?;
        Ok(self.extract_record(&text, metadata))
    }

    /// Translate upstream, then extract from the English text.
    ///
    /// The detected language is stored as `original_language`; the
    /// translated text becomes `raw_transcription`.
    ///
    /// # Errors
    /// Returns the translator's error unchanged.
    pub fn translate_and_extract(
        &self,
        text: &str,
        translator: &dyn Translator,
        source_language: Option<&str>,
        mut metadata: RecordMetadata,
    ) -> anyhow::Result<ExtractedRecord> {
        let translation = translator.translate(text, source_language)?;
        if translation.language.is_some() {
            metadata.original_language = translation.language;
        }
        Ok(self.extract_record(&translation.text, metadata))
    }
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ExtractionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionEngine")
            .field("matcher_rules", &self.matcher.rule_count())
            .field("chains", &self.chains)
            .finish_non_exhaustive()
    }
}
