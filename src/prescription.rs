//! Prescriptions written from the treatment panel and shown on the patient
//! and doctor dashboards.
//!
//! Status is never stored: [`derive_status`] computes it from the medication
//! end dates each time a list is shown.

use chrono::NaiveDate;
use serde::Serialize;

use crate::api::HospitalApi;
use crate::error::WorkflowError;
use crate::models::validation::require_text;
use crate::models::{
    ClinicalContext, MedicationLine, Medicine, Prescription, PrescriptionStatus, ValidationError,
};
use crate::requests::check_context;

/// ACTIVE while any medication runs through `today` or later, EXPIRED once
/// every course has ended. A prescription without medications is COMPLETED.
pub fn derive_status(prescription: &Prescription, today: NaiveDate) -> PrescriptionStatus {
    if prescription.medications.is_empty() {
        return PrescriptionStatus::Completed;
    }
    if prescription.medications.iter().any(|m| m.end_date >= today) {
        PrescriptionStatus::Active
    } else {
        PrescriptionStatus::Expired
    }
}

/// Medications tab state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationsDraft {
    pub lines: Vec<MedicationLine>,
    pub notes: String,
}

impl MedicationsDraft {
    pub fn add_line(&mut self, line: MedicationLine) {
        self.lines.push(line);
    }

    pub fn remove_line(&mut self, index: usize) -> Option<MedicationLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    pub fn validate(&self, ctx: ClinicalContext) -> Result<Prescription, ValidationError> {
        let ctx = check_context(Some(ctx))?;
        if self.lines.is_empty() {
            return Err(ValidationError::invalid("medications", "add at least one medication"));
        }
        let mut medications = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if line.end_date < line.start_date {
                return Err(ValidationError::invalid(
                    "endDate",
                    format!("{} ends before it starts", line.name.trim()),
                ));
            }
            medications.push(MedicationLine {
                name: require_text("name", &line.name)?,
                dosage: require_text("dosage", &line.dosage)?,
                frequency: line.frequency.trim().to_string(),
                duration: line.duration.trim().to_string(),
                ..line.clone()
            });
        }
        Ok(Prescription {
            id: None,
            doctor_id: ctx.doctor_id,
            patient_id: ctx.patient_id,
            reservation_id: ctx.reservation_id,
            medications,
            notes: self.notes.trim().to_string(),
        })
    }
}

pub fn create_prescription(
    api: &dyn HospitalApi,
    ctx: ClinicalContext,
    draft: &MedicationsDraft,
) -> Result<Prescription, WorkflowError> {
    let prescription = draft.validate(ctx).inspect_err(|err| {
        tracing::warn!(error = %err, "Prescription rejected");
    })?;
    let created = api.create_prescription(&prescription)?;
    tracing::info!(
        prescription_id = ?created.id,
        patient_id = created.patient_id,
        medications = created.medications.len(),
        "Prescription created"
    );
    Ok(created)
}

/// Drugs the signed-in doctor may prescribe.
pub fn medicine_catalog(api: &dyn HospitalApi) -> Result<Vec<Medicine>, WorkflowError> {
    Ok(api.medicines_for_doctor()?)
}

/// A prescription with its status as of the day it was listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrescriptionView {
    pub prescription: Prescription,
    pub status: PrescriptionStatus,
}

pub fn list_for_patient(
    api: &dyn HospitalApi,
    patient_id: i64,
    today: NaiveDate,
) -> Result<Vec<PrescriptionView>, WorkflowError> {
    let rows = api.prescriptions_for_patient(patient_id)?;
    Ok(rows
        .into_iter()
        .map(|prescription| PrescriptionView {
            status: derive_status(&prescription, today),
            prescription,
        })
        .collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub completed: usize,
    pub expired: usize,
}

impl StatusCounts {
    pub fn of(views: &[PrescriptionView]) -> Self {
        views.iter().fold(Self::default(), |mut counts, view| {
            match view.status {
                PrescriptionStatus::Active => counts.active += 1,
                PrescriptionStatus::Completed => counts.completed += 1,
                PrescriptionStatus::Expired => counts.expired += 1,
            }
            counts
        })
    }
}

pub fn filter_by_status(
    views: &[PrescriptionView],
    status: Option<PrescriptionStatus>,
) -> Vec<&PrescriptionView> {
    views
        .iter()
        .filter(|v| status.map_or(true, |s| v.status == s))
        .collect()
}
