//! Patient records and the storage trait behind the patient CRUD API.

use crate::error::{PatientError, ValidationError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default treatment phase for newly registered patients.
pub const DEFAULT_TREATMENT_PHASE: &str = "pre_treatment";

/// One entry of a patient's medical history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A stored patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub initial_weight_kg: Option<f64>,
    #[serde(default)]
    pub current_weight_kg: Option<f64>,
    #[serde(default)]
    pub medical_history: Vec<MedicalHistory>,
    /// pre_treatment, initiation, adaptation, maintenance, withdrawal
    pub treatment_phase: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for registering a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientCreate {
    #[serde(default, rename = "_id", alias = "id")]
    pub id: Option<String>,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub initial_weight_kg: Option<f64>,
    #[serde(default)]
    pub current_weight_kg: Option<f64>,
    #[serde(default)]
    pub medical_history: Vec<MedicalHistory>,
    #[serde(default)]
    pub treatment_phase: Option<String>,
}

/// Partial update; only provided fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub current_weight_kg: Option<f64>,
    #[serde(default)]
    pub medical_history: Option<Vec<MedicalHistory>>,
    #[serde(default)]
    pub treatment_phase: Option<String>,
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if len == 0 || len > 100 {
        return Err(ValidationError::new("name", "must be 1 to 100 characters"));
    }
    Ok(())
}

fn check_age(age: u32) -> Result<(), ValidationError> {
    if age > 150 {
        return Err(ValidationError::new("age", "must be between 0 and 150"));
    }
    Ok(())
}

fn check_measure(field: &str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !(v > 0.0 && v.is_finite()) => {
            Err(ValidationError::new(field, "must be a positive number"))
        }
        _ => Ok(()),
    }
}

impl PatientCreate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_name(&self.name)?;
        check_age(self.age)?;
        check_measure("height_cm", self.height_cm)?;
        check_measure("initial_weight_kg", self.initial_weight_kg)?;
        check_measure("current_weight_kg", self.current_weight_kg)?;
        Ok(())
    }

    /// Materialize a record, assigning an id and timestamps.
    pub fn into_patient(self) -> Patient {
        let now = Utc::now();
        Patient {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: self.name.trim().to_string(),
            age: self.age,
            gender: self.gender,
            height_cm: self.height_cm,
            initial_weight_kg: self.initial_weight_kg,
            current_weight_kg: self.current_weight_kg,
            medical_history: self.medical_history,
            treatment_phase: self
                .treatment_phase
                .unwrap_or_else(|| DEFAULT_TREATMENT_PHASE.to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}

impl PatientUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(age) = self.age {
            check_age(age)?;
        }
        check_measure("height_cm", self.height_cm)?;
        check_measure("current_weight_kg", self.current_weight_kg)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.height_cm.is_none()
            && self.current_weight_kg.is_none()
            && self.medical_history.is_none()
            && self.treatment_phase.is_none()
    }

    /// Apply the provided fields and bump `updated_at`.
    pub fn apply(self, patient: &mut Patient) {
        if let Some(name) = self.name {
            patient.name = name.trim().to_string();
        }
        if let Some(age) = self.age {
            patient.age = age;
        }
        if self.gender.is_some() {
            patient.gender = self.gender;
        }
        if self.height_cm.is_some() {
            patient.height_cm = self.height_cm;
        }
        if self.current_weight_kg.is_some() {
            patient.current_weight_kg = self.current_weight_kg;
        }
        if let Some(history) = self.medical_history {
            patient.medical_history = history;
        }
        if let Some(phase) = self.treatment_phase {
            patient.treatment_phase = phase;
        }
        patient.updated_at = Utc::now();
    }
}

/// Persistence for patient records.
///
/// Implementations: in-memory (default), document store (external).
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Insert a new record. Fails with `Conflict` if the id is taken.
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError>;

    async fn get(&self, id: &str) -> Result<Option<Patient>, PatientError>;

    /// Replace an existing record. Returns `false` if the id is unknown.
    async fn replace(&self, patient: Patient) -> Result<bool, PatientError>;

    async fn delete(&self, id: &str) -> Result<bool, PatientError>;

    /// Records in insertion order, paged.
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Patient>, PatientError>;

    async fn count(&self) -> Result<usize, PatientError>;
}
