//! Patient CRUD over a [`PatientStore`].

use medchat_core::error::{Error, PatientError, Result};
use medchat_core::patient::{Patient, PatientCreate, PatientStore, PatientUpdate};
use std::sync::Arc;
use tracing::{error, info};

/// Page size used when a listing names none.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

pub struct PatientService {
    store: Arc<dyn PatientStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }

    /// Register a patient. A taken id is a `Conflict`.
    pub async fn create(&self, request: PatientCreate) -> Result<Patient> {
        request.validate()?;
        let patient = request.into_patient();
        match self.store.insert(patient).await {
            Ok(patient) => {
                info!(patient_id = %patient.id, "Patient created");
                Ok(patient)
            }
            Err(e) => {
                error!(error = %e, "Failed to create patient");
                Err(e.into())
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<Patient> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PatientError::NotFound(id.to_string()).into())
    }

    /// Apply a partial update. An empty update returns the record unchanged.
    pub async fn update(&self, id: &str, update: PatientUpdate) -> Result<Patient> {
        update.validate()?;
        let mut patient = self.get(id).await?;
        if update.is_empty() {
            return Ok(patient);
        }

        update.apply(&mut patient);
        if !self.store.replace(patient.clone()).await? {
            return Err(PatientError::NotFound(id.to_string()).into());
        }
        info!(patient_id = %id, "Patient updated");
        Ok(patient)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.store.delete(id).await? {
            info!(patient_id = %id, "Patient deleted");
            Ok(())
        } else {
            Err(Error::Patient(PatientError::NotFound(id.to_string())))
        }
    }

    pub async fn list(&self, skip: usize, limit: usize) -> Result<Vec<Patient>> {
        Ok(self.store.list(skip, limit).await?)
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.count().await?)
    }
}
