//! Assembly of the canonical record from normalized fields.

use chrono::Utc;
use mediscribe_core::{ExtractedRecord, RecordMetadata};

use crate::fields::{Field, FieldCandidates};

/// Build a record from normalized candidates, merging caller metadata.
///
/// All canonical keys are present on the result; `raw_transcription` is
/// stored verbatim. No identifier is assigned here.
#[must_use]
pub fn build_record(
    fields: &FieldCandidates,
    raw_transcription: &str,
    metadata: RecordMetadata,
) -> ExtractedRecord {
    let timestamp = metadata.processed_at.unwrap_or_else(Utc::now);
    let scalar = |field| fields.first_text(field).map(str::to_string);

    ExtractedRecord {
        record_id: None,
        timestamp,
        patient_name: scalar(Field::PatientName),
        age: scalar(Field::Age),
        gender: scalar(Field::Gender),
        symptoms: fields.texts(Field::Symptoms),
        diagnosis: fields.texts(Field::Diagnosis),
        medications: fields.texts(Field::Medications),
        dosages: fields.texts(Field::Dosages),
        vital_signs: fields.texts(Field::VitalSigns),
        allergies: fields.texts(Field::Allergies),
        treatment_plan: fields.texts(Field::TreatmentPlan),
        follow_up: fields.texts(Field::FollowUp),
        raw_transcription: raw_transcription.to_string(),
        original_language: metadata.original_language,
        source: metadata.source,
    }
}
