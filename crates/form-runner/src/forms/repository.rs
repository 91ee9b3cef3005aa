use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{ApplicantId, Application, Form, FormId};

/// Storage for published form definitions.
pub trait FormRepository: Send + Sync {
    /// Creates the backing store if it does not exist yet. Safe to call repeatedly.
    fn ensure_ready(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
    fn get_form(&self, id: &FormId) -> Result<Option<Form>, RepositoryError>;
    fn get_forms(&self) -> Result<Vec<Form>, RepositoryError>;
    fn save_form(&self, form: Form) -> Result<(), RepositoryError>;
    fn update_form(&self, form: Form) -> Result<(), RepositoryError>;
    fn delete_form(&self, id: &FormId) -> Result<(), RepositoryError>;
}

/// Storage for in-flight applications, one per applicant.
pub trait ApplicationRepository: Send + Sync {
    fn ensure_ready(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
    fn get_application(&self, id: &ApplicantId) -> Result<Option<Application>, RepositoryError>;
    /// Inserts or replaces the application keyed by its applicant id.
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    fn delete_application(&self, id: &ApplicantId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryFormRepository {
    forms: Arc<Mutex<HashMap<FormId, Form>>>,
}

impl InMemoryFormRepository {
    pub fn with_forms(forms: impl IntoIterator<Item = Form>) -> Self {
        let repository = Self::default();
        if let Ok(mut guard) = repository.forms.lock() {
            guard.extend(forms.into_iter().map(|form| (form.id.clone(), form)));
        }
        repository
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<FormId, Form>>, RepositoryError> {
        self.forms
            .lock()
            .map_err(|_| RepositoryError::Unavailable("form store lock poisoned".to_string()))
    }
}

impl FormRepository for InMemoryFormRepository {
    fn get_form(&self, id: &FormId) -> Result<Option<Form>, RepositoryError> {
        Ok(self.guard()?.get(id).cloned())
    }

    fn get_forms(&self) -> Result<Vec<Form>, RepositoryError> {
        let mut forms: Vec<Form> = self.guard()?.values().cloned().collect();
        forms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(forms)
    }

    fn save_form(&self, form: Form) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&form.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(form.id.clone(), form);
        Ok(())
    }

    fn update_form(&self, form: Form) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        match guard.get_mut(&form.id) {
            Some(existing) => {
                *existing = form;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_form(&self, id: &FormId) -> Result<(), RepositoryError> {
        self.guard()?
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryApplicationRepository {
    applications: Arc<Mutex<HashMap<ApplicantId, Application>>>,
}

impl InMemoryApplicationRepository {
    fn guard(&self) -> Result<MutexGuard<'_, HashMap<ApplicantId, Application>>, RepositoryError> {
        self.applications.lock().map_err(|_| {
            RepositoryError::Unavailable("application store lock poisoned".to_string())
        })
    }

    pub fn len(&self) -> usize {
        self.guard().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn get_application(&self, id: &ApplicantId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.guard()?.get(id).cloned())
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        self.guard()?
            .insert(application.applicant_id.clone(), application);
        Ok(())
    }

    fn delete_application(&self, id: &ApplicantId) -> Result<(), RepositoryError> {
        self.guard()?
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}
