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

pub mod error;
pub mod record;
pub mod span;
pub mod util;

pub use error::InputError;
pub use record::{ExtractedRecord, RecordMetadata, parse_timestamp};
pub use span::{Category, EntitySpan, PERSON, Segmentation, Sentence, TextSpan};

/// Splits a transcript into sentences and supplies person-name candidates.
pub trait TextSegmenter: Send + Sync {
    fn segment(&self, text: &str) -> anyhow::Result<Segmentation>;
}

/// English text produced by an upstream translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Detected (or caller-declared) language of the original input.
    pub language: Option<String>,
}

/// Upstream machine translation. The extraction core only ever sees its output.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, source_language: Option<&str>)
    -> anyhow::Result<Translation>;
}

/// Append-only record storage.
///
/// Records are write-once: there is no update or delete. Reads return
/// owned copies.
pub trait RecordRepository: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Assign an identifier, persist, and return the identifier.
    fn append(&self, record: ExtractedRecord) -> Result<String, Self::Error>;

    /// The record with `record_id`, or `None` when unknown.
    fn get(&self, record_id: &str) -> Option<ExtractedRecord>;

    /// All records whose patient name equals `name` exactly, in store order.
    fn search_by_name(&self, name: &str) -> Vec<ExtractedRecord>;

    /// The first `limit` records in insertion order, or all when `None`.
    fn get_all(&self, limit: Option<usize>) -> Vec<ExtractedRecord>;
}
