//! The persisted record produced by one extraction run.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Caller-supplied provenance merged into a record at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Free-form tag identifying where the transcript came from.
    pub source: Option<String>,

    /// Language tag reported by an upstream translator.
    pub original_language: Option<String>,

    /// Processing instant; the build time is used when absent.
    pub processed_at: Option<DateTime<Utc>>,
}

impl RecordMetadata {
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_original_language(mut self, language: impl Into<String>) -> Self {
        self.original_language = Some(language.into());
        self
    }

    #[must_use]
    pub const fn with_processed_at(mut self, processed_at: DateTime<Utc>) -> Self {
        self.processed_at = Some(processed_at);
        self
    }
}

/// Structured clinical fields extracted from a transcript.
///
/// Every canonical key is always serialized, absent scalars as `null` and
/// absent lists as `[]`. List fields hold distinct entries (case-insensitive)
/// in first-match order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Assigned by the record store on first append.
    #[serde(default)]
    pub record_id: Option<String>,

    /// RFC 3339 on write; naive ISO 8601 is also read, as local time.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,

    pub patient_name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,

    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub diagnosis: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub dosages: Vec<String>,
    #[serde(default)]
    pub vital_signs: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub treatment_plan: Vec<String>,
    #[serde(default)]
    pub follow_up: Vec<String>,

    /// The exact text handed to the field extractor.
    pub raw_transcription: String,

    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ExtractedRecord {
    /// An empty record for `raw_transcription`, stamped with `timestamp`.
    #[must_use]
    pub fn empty(raw_transcription: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            record_id: None,
            timestamp,
            patient_name: None,
            age: None,
            gender: None,
            symptoms: Vec::new(),
            diagnosis: Vec::new(),
            medications: Vec::new(),
            dosages: Vec::new(),
            vital_signs: Vec::new(),
            allergies: Vec::new(),
            treatment_plan: Vec::new(),
            follow_up: Vec::new(),
            raw_transcription: raw_transcription.into(),
            original_language: None,
            source: None,
        }
    }

    /// The list fields paired with their canonical key.
    #[must_use]
    pub fn list_fields(&self) -> [(&'static str, &[String]); 8] {
        [
            ("symptoms", &self.symptoms),
            ("diagnosis", &self.diagnosis),
            ("medications", &self.medications),
            ("dosages", &self.dosages),
            ("vital_signs", &self.vital_signs),
            ("allergies", &self.allergies),
            ("treatment_plan", &self.treatment_plan),
            ("follow_up", &self.follow_up),
        ]
    }

    /// True when no scalar is set and every list is empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.patient_name.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.list_fields().iter().all(|(_, values)| values.is_empty())
    }

    /// Write this record as pretty UTF-8 JSON, replacing `path` atomically.
    pub fn save_json(&self, path: &std::path::Path) -> std::io::Result<()> {
        crate::util::write_json_atomic(path, self)
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one (`2024-01-01T12:00:00.123456`)
/// interpreted in the local time zone.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Some(
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc)),
    )
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_empty_record_serializes_every_key() {
        let record = ExtractedRecord::empty("", Utc::now());
        let value = serde_json::to_value(&record).expect("record should serialize");
        let object = value.as_object().expect("record should be an object");

        for key in [
            "record_id",
            "timestamp",
            "patient_name",
            "age",
            "gender",
            "symptoms",
            "diagnosis",
            "medications",
            "dosages",
            "vital_signs",
            "allergies",
            "treatment_plan",
            "follow_up",
            "raw_transcription",
            "original_language",
            "source",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert!(object["patient_name"].is_null());
        assert_eq!(object["symptoms"], serde_json::json!([]));
        assert!(record.is_blank());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_record_preserves_unicode() {
        let mut record = ExtractedRecord::empty("Le patient a de la fièvre", Utc::now());
        record.patient_name = Some("José Müller".to_string());

        let json = serde_json::to_string(&record).expect("record should serialize");
        assert!(json.contains("José Müller"));
        assert!(json.contains("fièvre"));

        let back: ExtractedRecord = serde_json::from_str(&json).expect("record should parse");
        assert_eq!(back, record);
    }

    #[test]
    fn test_metadata_builder() {
        let meta = RecordMetadata::default()
            .with_source("vibe")
            .with_original_language("spanish");
        assert_eq!(meta.source.as_deref(), Some("vibe"));
        assert_eq!(meta.original_language.as_deref(), Some("spanish"));
        assert!(meta.processed_at.is_none());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_naive_timestamp_read_as_local() {
        let parsed = parse_timestamp("2024-01-01T12:00:00.123456").expect("naive ISO timestamp");
        assert_eq!(
            parsed.with_timezone(&Local).naive_local().to_string(),
            "2024-01-01 12:00:00.123456"
        );

        let whole_seconds = parse_timestamp("2024-01-01T12:00:00").expect("no fraction");
        assert_eq!(
            whole_seconds.with_timezone(&Local).naive_local().to_string(),
            "2024-01-01 12:00:00"
        );
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_offset_timestamp_keeps_instant() {
        let parsed = parse_timestamp("2024-01-01T12:00:00+02:00").expect("RFC 3339");
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T10:00:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_legacy_record_without_metadata_keys() {
        let json = r#"{
            "record_id": "REC-20240101120000",
            "timestamp": "2024-01-01T12:00:00.123456",
            "patient_name": "John Doe",
            "age": "45",
            "gender": "male",
            "symptoms": ["cough"],
            "diagnosis": [],
            "medications": [],
            "dosages": [],
            "vital_signs": [],
            "allergies": [],
            "treatment_plan": [],
            "follow_up": [],
            "raw_transcription": "Patient John Doe"
        }"#;
        let record: ExtractedRecord = serde_json::from_str(json).expect("legacy record parses");
        assert_eq!(record.record_id.as_deref(), Some("REC-20240101120000"));
        assert_eq!(record.source, None);
        assert_eq!(record.original_language, None);

        assert!(serde_json::from_str::<ExtractedRecord>(
            &json.replace("2024-01-01T12:00:00.123456", "not a time")
        )
        .is_err());
    }
}
