//! Patient domain model and field validation.
//!
//! # Responsibility
//! - Define the canonical patient record persisted in the collection.
//! - Validate caller-supplied field sets, reporting every violated field.
//! - Derive `bmi` and `verdict` from stored height/weight.
//!
//! # Invariants
//! - A `Patient` or `PatientRecord` only exists for fields that passed
//!   validation; there is no unchecked constructor.
//! - `bmi` and `verdict` are derived, never persisted.
//! - `id` is the collection key and is not stored inside the record value.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Collection key for one patient.
pub type PatientId = String;

/// Age bounds are exclusive on both ends.
const AGE_LOWER_EXCLUSIVE: i64 = 0;
const AGE_UPPER_EXCLUSIVE: i64 = 120;
const UNDERWEIGHT_BELOW: f64 = 18.5;
const OBESE_FROM: f64 = 30.0;

/// Patient gender as accepted on input and persisted on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Stable lowercase string used on disk and in CLI input.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

/// Parses a gender value. Matching is exact and case-sensitive.
pub fn parse_gender(value: &str) -> Option<Gender> {
    match value {
        "male" => Some(Gender::Male),
        "female" => Some(Gender::Female),
        "other" => Some(Gender::Other),
        _ => None,
    }
}

/// Weight class derived from a rounded BMI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BmiVerdict {
    Underweight,
    Normal,
    Obese,
}

impl BmiVerdict {
    /// Classifies an already rounded BMI.
    ///
    /// `18.5` is the first `Normal` value and `30.0` the first `Obese` value.
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < UNDERWEIGHT_BELOW {
            Self::Underweight
        } else if bmi < OBESE_FROM {
            Self::Normal
        } else {
            Self::Obese
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Obese => "Obese",
        }
    }
}

/// Computes `weight / height²` rounded to two decimals.
///
/// Rounding works on the exact binary value of the quotient and sends ties
/// to even, so `72.5 / 4.0 = 18.125` becomes `18.12`. Scaling by 100 first
/// would add its own error and push values like `95.3 / 4.0` up to `23.83`.
pub fn compute_bmi(height: f64, weight: f64) -> f64 {
    let raw = weight / (height * height);
    // `{:.2}` formats the exact value with round-half-to-even.
    format!("{raw:.2}").parse().unwrap_or(raw)
}

/// One violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Field name as it appears on the wire (`id`, `age`, ...).
    pub field: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

/// Validation failure listing every violated field in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientValidationError {
    violations: Vec<FieldViolation>,
}

impl PatientValidationError {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Returns whether `field` is among the violated fields.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|item| item.field == field)
    }

    fn from_violations(violations: Vec<FieldViolation>) -> Result<(), Self> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self { violations })
        }
    }
}

impl Display for PatientValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid patient fields: ")?;
        for (index, item) in self.violations.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", item.field, item.reason)?;
        }
        Ok(())
    }
}

impl Error for PatientValidationError {}

/// Validates a collection key on its own.
pub fn validate_patient_id(id: &str) -> Result<(), PatientValidationError> {
    let mut violations = Vec::new();
    check_text("id", id, &mut violations);
    PatientValidationError::from_violations(violations)
}

/// Persisted value for one patient (every field except `id`).
///
/// Deserialization runs full validation, so a collection that loads is a
/// collection of valid records. Unknown keys such as a stale `bmi` are
/// ignored on read and never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPatientRecord")]
pub struct PatientRecord {
    name: String,
    city: String,
    age: u8,
    gender: Gender,
    height: f64,
    weight: f64,
}

#[derive(Deserialize)]
struct RawPatientRecord {
    name: String,
    city: String,
    age: i64,
    gender: String,
    height: f64,
    weight: f64,
}

impl TryFrom<RawPatientRecord> for PatientRecord {
    type Error = PatientValidationError;

    fn try_from(raw: RawPatientRecord) -> Result<Self, Self::Error> {
        Self::new(
            raw.name,
            raw.city,
            raw.age,
            raw.gender.as_str(),
            raw.height,
            raw.weight,
        )
    }
}

impl PatientRecord {
    /// Builds a record after checking every field.
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        age: i64,
        gender: &str,
        height: f64,
        weight: f64,
    ) -> Result<Self, PatientValidationError> {
        check_record_fields(
            name.into(),
            city.into(),
            age,
            gender,
            height,
            weight,
            Vec::new(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    /// Height in meters.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Weight in kilograms.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn bmi(&self) -> f64 {
        compute_bmi(self.height, self.weight)
    }

    pub fn verdict(&self) -> BmiVerdict {
        BmiVerdict::from_bmi(self.bmi())
    }
}

/// Validated patient with its derived attributes.
///
/// Serializes as the flat output shape
/// `{id, name, city, age, gender, height, weight, bmi, verdict}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patient {
    id: PatientId,
    #[serde(flatten)]
    record: PatientRecord,
    bmi: f64,
    verdict: BmiVerdict,
}

impl Patient {
    /// Validates a full candidate field set.
    ///
    /// # Errors
    /// - Returns every violated field, not only the first one.
    pub fn validate(draft: &PatientDraft) -> Result<Self, PatientValidationError> {
        let mut violations = Vec::new();
        check_text("id", &draft.id, &mut violations);
        let record = check_record_fields(
            draft.name.clone(),
            draft.city.clone(),
            draft.age,
            draft.gender.as_str(),
            draft.height,
            draft.weight,
            violations,
        )?;
        Self::from_stored(draft.id.clone(), record)
    }

    /// Rebuilds a patient from a persisted collection entry.
    pub fn from_stored(
        id: impl Into<PatientId>,
        record: PatientRecord,
    ) -> Result<Self, PatientValidationError> {
        let id = id.into();
        validate_patient_id(&id)?;
        let bmi = record.bmi();
        Ok(Self {
            id,
            verdict: BmiVerdict::from_bmi(bmi),
            bmi,
            record,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn record(&self) -> &PatientRecord {
        &self.record
    }

    pub fn bmi(&self) -> f64 {
        self.bmi
    }

    pub fn verdict(&self) -> BmiVerdict {
        self.verdict
    }

    /// Splits into collection key and stored value.
    pub fn into_parts(self) -> (PatientId, PatientRecord) {
        (self.id, self.record)
    }
}

/// Candidate field set supplied by a caller for create.
///
/// Kept loosely typed (`age` as `i64`, `gender` as text) so validation can
/// report all bad fields together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub id: String,
    pub name: String,
    pub city: String,
    pub age: i64,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
}

impl From<&Patient> for PatientDraft {
    fn from(patient: &Patient) -> Self {
        let record = patient.record();
        Self {
            id: patient.id.clone(),
            name: record.name.clone(),
            city: record.city.clone(),
            age: i64::from(record.age),
            gender: record.gender.as_str().to_string(),
            height: record.height,
            weight: record.weight,
        }
    }
}

/// Sparse field overrides for update. `id` is not updatable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl PatientUpdate {
    /// Returns whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.city.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.height.is_none()
            && self.weight.is_none()
    }

    /// Checks the fields that are present; absent fields are not checked.
    pub fn validate(&self) -> Result<(), PatientValidationError> {
        let mut violations = Vec::new();
        if let Some(name) = &self.name {
            check_text("name", name, &mut violations);
        }
        if let Some(city) = &self.city {
            check_text("city", city, &mut violations);
        }
        if let Some(age) = self.age {
            check_age(age, &mut violations);
        }
        if let Some(gender) = &self.gender {
            check_gender(gender, &mut violations);
        }
        if let Some(height) = self.height {
            check_positive("height", height, &mut violations);
        }
        if let Some(weight) = self.weight {
            check_positive("weight", weight, &mut violations);
        }
        PatientValidationError::from_violations(violations)
    }

    /// Overlays present fields onto `draft`.
    pub fn apply_to(&self, draft: &mut PatientDraft) {
        if let Some(name) = &self.name {
            draft.name = name.clone();
        }
        if let Some(city) = &self.city {
            draft.city = city.clone();
        }
        if let Some(age) = self.age {
            draft.age = age;
        }
        if let Some(gender) = &self.gender {
            draft.gender = gender.clone();
        }
        if let Some(height) = self.height {
            draft.height = height;
        }
        if let Some(weight) = self.weight {
            draft.weight = weight;
        }
    }

    /// Merges onto `current` and re-validates the merged field set.
    ///
    /// The returned patient keeps `current`'s id and recomputes `bmi` and
    /// `verdict`.
    pub fn merge_into(&self, current: &Patient) -> Result<Patient, PatientValidationError> {
        let mut draft = PatientDraft::from(current);
        self.apply_to(&mut draft);
        Patient::validate(&draft)
    }
}

fn check_record_fields(
    name: String,
    city: String,
    age: i64,
    gender: &str,
    height: f64,
    weight: f64,
    mut violations: Vec<FieldViolation>,
) -> Result<PatientRecord, PatientValidationError> {
    check_text("name", &name, &mut violations);
    check_text("city", &city, &mut violations);
    let age = check_age(age, &mut violations);
    let gender = check_gender(gender, &mut violations);
    check_positive("height", height, &mut violations);
    check_positive("weight", weight, &mut violations);

    match (age, gender) {
        (Some(age), Some(gender)) if violations.is_empty() => Ok(PatientRecord {
            name,
            city,
            age,
            gender,
            height,
            weight,
        }),
        _ => Err(PatientValidationError { violations }),
    }
}

fn check_text(field: &'static str, value: &str, violations: &mut Vec<FieldViolation>) {
    if value.trim().is_empty() {
        violations.push(FieldViolation {
            field,
            reason: "must not be empty".to_string(),
        });
    }
}

fn check_age(value: i64, violations: &mut Vec<FieldViolation>) -> Option<u8> {
    if value > AGE_LOWER_EXCLUSIVE && value < AGE_UPPER_EXCLUSIVE {
        return u8::try_from(value).ok();
    }
    violations.push(FieldViolation {
        field: "age",
        reason: format!(
            "must be greater than {AGE_LOWER_EXCLUSIVE} and less than {AGE_UPPER_EXCLUSIVE}, got {value}"
        ),
    });
    None
}

fn check_gender(value: &str, violations: &mut Vec<FieldViolation>) -> Option<Gender> {
    let gender = parse_gender(value);
    if gender.is_none() {
        violations.push(FieldViolation {
            field: "gender",
            reason: format!("must be one of male|female|other, got `{value}`"),
        });
    }
    gender
}

fn check_positive(field: &'static str, value: f64, violations: &mut Vec<FieldViolation>) {
    if !(value.is_finite() && value > 0.0) {
        violations.push(FieldViolation {
            field,
            reason: format!("must be a finite number greater than 0, got {value}"),
        });
    }
}
