//! In-process patient storage.

use async_trait::async_trait;
use medchat_core::error::PatientError;
use medchat_core::patient::{Patient, PatientStore};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Patient records kept in insertion order.
#[derive(Clone, Default)]
pub struct InMemoryPatientStore {
    patients: Arc<RwLock<Vec<Patient>>>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError> {
        let mut patients = self.patients.write().await;
        if patients.iter().any(|p| p.id == patient.id) {
            return Err(PatientError::Conflict(patient.id));
        }
        patients.push(patient.clone());
        Ok(patient)
    }

    async fn get(&self, id: &str) -> Result<Option<Patient>, PatientError> {
        Ok(self
            .patients
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn replace(&self, patient: Patient) -> Result<bool, PatientError> {
        let mut patients = self.patients.write().await;
        match patients.iter_mut().find(|p| p.id == patient.id) {
            Some(slot) => {
                *slot = patient;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, PatientError> {
        let mut patients = self.patients.write().await;
        let before = patients.len();
        patients.retain(|p| p.id != id);
        Ok(patients.len() < before)
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Patient>, PatientError> {
        Ok(self
            .patients
            .read()
            .await
            .iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize, PatientError> {
        Ok(self.patients.read().await.len())
    }
}
