//! Shared list of medical specialties, fetched once and reused by every
//! reservation form.

use std::sync::{PoisonError, RwLock};

use crate::api::HospitalApi;
use crate::error::WorkflowError;
use crate::models::Specialty;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialtiesAction {
    Loaded(Vec<Specialty>),
    Add(Specialty),
    Remove(i64),
    Clear,
}

#[derive(Debug, Default)]
struct CacheState {
    items: Vec<Specialty>,
    fetched: bool,
}

#[derive(Debug, Default)]
pub struct SpecialtiesCache {
    state: RwLock<CacheState>,
}

impl SpecialtiesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self, action: SpecialtiesAction) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match action {
            SpecialtiesAction::Loaded(items) => {
                state.items = items;
                state.fetched = true;
            }
            SpecialtiesAction::Add(specialty) => {
                if !state.items.iter().any(|s| s.id == specialty.id) {
                    state.items.push(specialty);
                }
            }
            SpecialtiesAction::Remove(id) => state.items.retain(|s| s.id != id),
            SpecialtiesAction::Clear => {
                state.items.clear();
                state.fetched = false;
            }
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).fetched
    }

    pub fn list(&self) -> Vec<Specialty> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).items.clone()
    }

    /// Always hits the backend and replaces the cached list.
    pub fn fetch(&self, api: &dyn HospitalApi) -> Result<Vec<Specialty>, WorkflowError> {
        let items = api.specialties()?;
        tracing::debug!(count = items.len(), "Specialties loaded");
        self.dispatch(SpecialtiesAction::Loaded(items.clone()));
        Ok(items)
    }

    pub fn get_or_fetch(&self, api: &dyn HospitalApi) -> Result<Vec<Specialty>, WorkflowError> {
        if self.is_fetched() {
            return Ok(self.list());
        }
        self.fetch(api)
    }

    pub fn find(&self, id: i64) -> Option<Specialty> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn display_name(&self, id: i64) -> Option<String> {
        self.find(id).map(|s| s.display_name)
    }
}
