#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub mod batch;
pub mod builder;
pub mod dedup;
pub mod detectors;
pub mod engine;
pub mod fields;
pub mod input;
pub mod patterns;
pub mod segment;
pub mod tokens;

pub use batch::{
    BatchError, BatchFailure, BatchItem, BatchReport, IngestReport, extract_dir, ingest_dir,
};
pub use builder::build_record;
pub use detectors::{
    CategorySpans, ChainPolicy, DetectionInput, Detector, DetectorChain, DetectorError,
    KeywordScan, PersonEntities,
};
pub use engine::{ExtractionConfig, ExtractionEngine, default_symptom_keywords};
pub use fields::{Field, FieldCandidates, FieldRuleDef, RegexRule, RuleMode, default_field_rules};
pub use input::{read_transcript, transcript_from_json};
pub use patterns::{
    BuildError, PatternDef, PatternMatch, PatternMatcher, PatternRule, default_pattern_rules,
};
pub use segment::RuleSegmenter;
