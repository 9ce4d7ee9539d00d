//! Canonical fields and the configurable regex rules that fill them.

use mediscribe_core::TextSpan;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::detectors::{DetectionInput, Detector, DetectorError};
use crate::patterns::BuildError;

/// The canonical record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Field {
    PatientName = 0,
    Age = 1,
    Gender = 2,
    Symptoms = 3,
    Diagnosis = 4,
    Medications = 5,
    Dosages = 6,
    VitalSigns = 7,
    Allergies = 8,
    TreatmentPlan = 9,
    FollowUp = 10,
}

impl Field {
    pub const COUNT: usize = 11;

    pub const ALL: [Self; Self::COUNT] = [
        Self::PatientName,
        Self::Age,
        Self::Gender,
        Self::Symptoms,
        Self::Diagnosis,
        Self::Medications,
        Self::Dosages,
        Self::VitalSigns,
        Self::Allergies,
        Self::TreatmentPlan,
        Self::FollowUp,
    ];

    /// Returns the record key for this field.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::PatientName => "patient_name",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Symptoms => "symptoms",
            Self::Diagnosis => "diagnosis",
            Self::Medications => "medications",
            Self::Dosages => "dosages",
            Self::VitalSigns => "vital_signs",
            Self::Allergies => "allergies",
            Self::TreatmentPlan => "treatment_plan",
            Self::FollowUp => "follow_up",
        }
    }

    /// Scalar fields hold at most one value.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::PatientName | Self::Age | Self::Gender)
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for Field {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s.to_lowercase())
            .ok_or("unknown field")
    }
}

/// Unvalidated candidates per canonical field, in detection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCandidates {
    spans: [Vec<TextSpan>; Field::COUNT],
}

impl FieldCandidates {
    #[must_use]
    pub fn get(&self, field: Field) -> &[TextSpan] {
        &self.spans[field.index()]
    }

    /// First candidate text of a field.
    #[must_use]
    pub fn first_text(&self, field: Field) -> Option<&str> {
        self.get(field).first().map(|s| s.text.as_str())
    }

    /// Candidate texts of a field.
    #[must_use]
    pub fn texts(&self, field: Field) -> Vec<String> {
        self.get(field).iter().map(|s| s.text.clone()).collect()
    }

    pub fn set(&mut self, field: Field, spans: Vec<TextSpan>) {
        self.spans[field.index()] = spans;
    }

    /// Take every field's candidates out, in [`Field::ALL`] order.
    pub fn drain(&mut self) -> impl Iterator<Item = (Field, Vec<TextSpan>)> + '_ {
        Field::ALL
            .into_iter()
            .map(|field| (field, std::mem::take(&mut self.spans[field.index()])))
    }
}

/// How many matches a rule contributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Only the first match in the text is considered.
    #[default]
    First,
    /// Every non-overlapping match is considered.
    All,
}

/// Definition of a field rule: a regex whose first participating capture
/// group becomes a candidate for `field`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldRuleDef {
    /// Unique identifier, also the detector name in logs.
    pub id: String,

    /// Record key of the target field.
    pub field: String,

    /// Regex pattern; without capture groups the whole match is used.
    pub pattern: String,

    #[serde(default)]
    pub mode: RuleMode,

    /// Captures longer than this many characters are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,

    /// The match is dropped when its capture contains any of these
    /// phrases (case-insensitive).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reject_containing: Vec<String>,

    /// Lowercased capture → canonical value. When non-empty, captures with
    /// no entry are dropped.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub canonical: BTreeMap<String, String>,
}

impl FieldRuleDef {
    fn new(id: &str, field: Field, pattern: &str) -> Self {
        Self {
            id: id.to_string(),
            field: field.as_str().to_string(),
            pattern: pattern.to_string(),
            mode: RuleMode::First,
            max_len: None,
            reject_containing: Vec::new(),
            canonical: BTreeMap::new(),
        }
    }

    const fn all(mut self) -> Self {
        self.mode = RuleMode::All;
        self
    }

    /// Compile into a detector for its field.
    ///
    /// # Errors
    /// Returns an error if the field name or the regex is invalid.
    pub fn build(&self) -> Result<(Field, RegexRule), BuildError> {
        let field = Field::from_str(&self.field).map_err(|_| BuildError::Field {
            id: self.id.clone(),
            field: self.field.clone(),
        })?;
        let regex = Regex::new(&self.pattern).map_err(|source| BuildError::Regex {
            id: self.id.clone(),
            source,
        })?;

        Ok((
            field,
            RegexRule {
                id: self.id.clone(),
                regex,
                mode: self.mode,
                max_len: self.max_len,
                reject_containing: self
                    .reject_containing
                    .iter()
                    .map(|p| p.to_lowercase())
                    .collect(),
                canonical: self
                    .canonical
                    .iter()
                    .map(|(k, v)| (k.to_lowercase(), v.clone()))
                    .collect(),
            },
        ))
    }
}

/// A compiled field rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    id: String,
    regex: Regex,
    mode: RuleMode,
    max_len: Option<usize>,
    reject_containing: Vec<String>,
    canonical: BTreeMap<String, String>,
}

impl RegexRule {
    fn accept(&self, text: &str, caps: &Captures<'_>) -> Option<TextSpan> {
        let group = (1..caps.len())
            .find_map(|i| caps.get(i))
            .or_else(|| caps.get(0))?;
        let mut span = TextSpan::trimmed(text, group.start(), group.end())?;

        if self.max_len.is_some_and(|max| span.text.chars().count() > max) {
            return None;
        }
        let lower = span.text.to_lowercase();
        if self.reject_containing.iter().any(|p| lower.contains(p)) {
            return None;
        }
        if !self.canonical.is_empty() {
            span.text = self.canonical.get(&lower)?.clone();
        }
        Some(span)
    }
}

impl Detector for RegexRule {
    fn name(&self) -> &str {
        &self.id
    }

    fn detect(&self, input: &DetectionInput<'_>) -> Result<Vec<TextSpan>, DetectorError> {
        let text = input.text;
        let spans = match self.mode {
            RuleMode::First => self
                .regex
                .captures(text)
                .and_then(|caps| self.accept(text, &caps))
                .into_iter()
                .collect(),
            RuleMode::All => self
                .regex
                .captures_iter(text)
                .filter_map(|caps| self.accept(text, &caps))
                .collect(),
        };
        Ok(spans)
    }
}

/// Default field rules. For each field, list order is detector precedence.
#[must_use]
pub fn default_field_rules() -> Vec<FieldRuleDef> {
    let mut rules = Vec::new();
    rules.extend(identity_rules());
    rules.extend(clinical_rules());
    rules.extend(plan_rules());
    rules
}

/// Name, age and gender.
fn identity_rules() -> Vec<FieldRuleDef> {
    let mut gender = FieldRuleDef::new(
        "gender_keyword",
        Field::Gender,
        r"(?i)\b(male|female|man|woman)\b",
    );
    gender.canonical = [
        ("male", "male"),
        ("man", "male"),
        ("female", "female"),
        ("woman", "female"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    vec![
        FieldRuleDef::new(
            "name_introduction",
            Field::PatientName,
            r"\b(?i:i am|my name is|i'm)\s+(\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\p{Ll}+)*)",
        ),
        FieldRuleDef::new(
            "name_patient_label",
            Field::PatientName,
            r"(?m)^[ \t]*Patient:[ \t]*(\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\p{Ll}+)*)",
        ),
        FieldRuleDef::new("age_years_old", Field::Age, r"(?i)(\d+)\s*years?[\s-]*old"),
        FieldRuleDef::new(
            "age_statement",
            Field::Age,
            r"(?i)\bI am (\d+)|\bI'm (\d+)|\bage[:\s]+(\d+)",
        ),
        gender,
    ]
}

/// Symptoms, diagnosis, medications and allergies.
fn clinical_rules() -> Vec<FieldRuleDef> {
    let mut symptom_cue = FieldRuleDef::new(
        "symptom_cue",
        Field::Symptoms,
        r"(?i)(?:I have|I'm feeling|feeling|experiencing|suffering from)\s+(?:a\s+)?([a-z\s]+?)(?:[.,]|\band\b|$)",
    )
    .all();
    symptom_cue.max_len = Some(50);

    let mut allergy = FieldRuleDef::new(
        "allergy_label",
        Field::Allergies,
        r"(?i)allerg(?:y|ies)[:\s]+([^.]+)",
    );
    allergy.reject_containing = vec!["no known".to_string()];

    vec![
        symptom_cue,
        FieldRuleDef::new("diagnosis_label", Field::Diagnosis, r"(?i)diagnosis[:\s]+([^.]+)"),
        FieldRuleDef::new("prescribed_drug", Field::Medications, r"(?i)prescribed\s+(\w+)").all(),
        allergy,
    ]
}

/// Treatment plan and follow-up.
fn plan_rules() -> Vec<FieldRuleDef> {
    vec![
        FieldRuleDef::new(
            "treatment_plan_label",
            Field::TreatmentPlan,
            r"(?i)treatment\s+plan[:\s]+([^.]+(?:\.[^.]+)?)",
        ),
        FieldRuleDef::new(
            "follow_up_label",
            Field::FollowUp,
            r"(?i)follow[\s-]up[:\s]+([^.]+)",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediscribe_core::Segmentation;

    fn run(rule_id: &str, text: &str) -> Vec<String> {
        let def = default_field_rules()
            .into_iter()
            .find(|d| d.id == rule_id)
            .unwrap_or_else(|| panic!("no default rule {rule_id}"));
        let (_, rule) = def
            .build()
            .unwrap_or_else(|e| panic!("default rule {rule_id} should build: {e}"));
        let segmentation = Segmentation::whole(text);
        let input = DetectionInput {
            text,
            segmentation: &segmentation,
            matches: &[],
        };
        rule.detect(&input)
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.text)
            .collect()
    }

    #[test]
    fn test_field_conversion() {
        assert_eq!(Field::from_str("vital_signs"), Ok(Field::VitalSigns));
        assert_eq!(Field::from_str("FOLLOW_UP"), Ok(Field::FollowUp));
        assert!(Field::from_str("blood_type").is_err());
        assert!(Field::Age.is_scalar());
        assert!(!Field::Symptoms.is_scalar());
    }

    #[test]
    fn test_default_rules_all_build() {
        for def in default_field_rules() {
            assert!(def.build().is_ok(), "rule {} failed to build", def.id);
        }
    }

    #[test]
    fn test_name_introduction_requires_capitalized_name() {
        assert_eq!(run("name_introduction", "Hi, my name is Sarah Connor."), [
            "Sarah Connor"
        ]);
        assert_eq!(run("name_introduction", "i'm Tom"), ["Tom"]);
        assert!(run("name_introduction", "I'm feeling sick").is_empty());
        assert!(run("name_introduction", "I am 45").is_empty());
    }

    #[test]
    fn test_name_rules_accept_accented_names() {
        assert_eq!(run("name_introduction", "My name is José Núñez."), [
            "José Núñez"
        ]);
        assert_eq!(run("name_patient_label", "Patient: Zoë Ångström\n"), [
            "Zoë Ångström"
        ]);
    }

    #[test]
    fn test_patient_label_at_line_start() {
        assert_eq!(run("name_patient_label", "Visit note\nPatient: Maria Lopez\n"), [
            "Maria Lopez"
        ]);
        assert!(run("name_patient_label", "the Patient: Maria Lopez").is_empty());
    }

    #[test]
    fn test_age_rules() {
        assert_eq!(run("age_years_old", "a 45 year old male"), ["45"]);
        assert_eq!(run("age_years_old", "she is 7 years old"), ["7"]);
        assert_eq!(run("age_statement", "I'm 30 and tired"), ["30"]);
        assert_eq!(run("age_statement", "Age: 62"), ["62"]);
    }

    #[test]
    fn test_gender_is_canonicalized() {
        assert_eq!(run("gender_keyword", "A WOMAN presents"), ["female"]);
        assert_eq!(run("gender_keyword", "45 year old male"), ["male"]);
        assert!(run("gender_keyword", "the manager called").is_empty());
    }

    #[test]
    fn test_symptom_cue_stops_at_clause_boundary() {
        assert_eq!(
            run("symptom_cue", "I have a sore throat and I'm feeling dizzy, doctor."),
            ["sore throat", "dizzy"]
        );
    }

    #[test]
    fn test_symptom_cue_rejects_run_on_capture() {
        let text = "I have been dealing with this for a very long time without any relief at all";
        assert!(run("symptom_cue", text).is_empty());
    }

    #[test]
    fn test_allergy_negation() {
        assert_eq!(run("allergy_label", "Allergies: penicillin."), ["penicillin"]);
        assert!(run("allergy_label", "Allergies: no known drug allergies.").is_empty());
        assert!(run("allergy_label", "No known allergies.").is_empty());
    }

    #[test]
    fn test_medication_takes_single_token() {
        assert_eq!(
            run("prescribed_drug", "Prescribed Amoxicillin 500mg. Also prescribed ibuprofen."),
            ["Amoxicillin", "ibuprofen"]
        );
    }

    #[test]
    fn test_plan_spans() {
        let text = "Treatment plan: Rest, fluids. Monitor temperature. Extra. Follow-up: one week.";
        assert_eq!(run("treatment_plan_label", text), [
            "Rest, fluids. Monitor temperature"
        ]);
        assert_eq!(run("follow_up_label", text), ["one week"]);
    }

    #[test]
    fn test_invalid_field_name() {
        let def = FieldRuleDef::new("x", Field::Age, "a");
        let def = FieldRuleDef {
            field: "blood_type".to_string(),
            ..def
        };
        assert!(matches!(def.build(), Err(BuildError::Field { .. })));
    }

    #[test]
    fn test_candidates_accessors() {
        let mut candidates = FieldCandidates::default();
        candidates.set(Field::Age, vec![TextSpan::new("45", 0, 2)]);
        assert_eq!(candidates.first_text(Field::Age), Some("45"));
        assert!(candidates.get(Field::Gender).is_empty());
        assert_eq!(candidates.drain().count(), Field::COUNT);
        assert!(candidates.get(Field::Age).is_empty());
    }
}
