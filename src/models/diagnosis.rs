use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::TreatmentType;

/// Button the doctor pressed to finish the treatment panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminalAction {
    SaveAndExit,
    RequestConsultation,
    CreateAppointment,
}

/// Body of `POST /doctor/diagnoses/create`. Immutable once posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisSubmission {
    pub reservation_id: i64,
    pub diagnostic_info: DiagnosticInfo,
    pub treatment_plan: TreatmentPlan,
    pub actions: ActionFlags,
    pub metadata: SubmissionMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticInfo {
    pub preliminary_diagnosis: String,
    pub final_diagnosis: String,
    pub diagnostic_details: String,
    pub icd_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPlan {
    pub treatment_type: TreatmentType,
    pub treatment_details: String,
    pub follow_up_date: Option<NaiveDate>,
}

/// Exactly one flag is set: the action that finished the visit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFlags {
    pub save_and_exit: bool,
    pub request_consultation: bool,
    pub create_appointment: bool,
}

impl From<TerminalAction> for ActionFlags {
    fn from(action: TerminalAction) -> Self {
        let mut flags = Self::default();
        match action {
            TerminalAction::SaveAndExit => flags.save_and_exit = true,
            TerminalAction::RequestConsultation => flags.request_consultation = true,
            TerminalAction::CreateAppointment => flags.create_appointment = true,
        }
        flags
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
