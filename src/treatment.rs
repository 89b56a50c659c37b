//! The doctor's treatment panel for one visit.
//!
//! Five tabs, freely selectable, each with its own draft. A terminal action
//! either saves vitals (on the vitals tab) or turns the panel into a single
//! [`DiagnosisSubmission`]. The submission is posted once; afterwards the
//! panel refuses to submit again.

use chrono::{NaiveDate, Utc};

use crate::api::HospitalApi;
use crate::error::WorkflowError;
use crate::models::validation::{normalize_icd10, require, require_id};
use crate::models::{
    ClinicalContext, DiagnosisSubmission, DiagnosticInfo, ImagingRequest, LabRequest,
    Prescription, Reservation, SubmissionMetadata, TerminalAction, TreatmentPlan, TreatmentType,
    ValidationError, VitalsDraft, VitalsRecord,
};
use crate::prescription;
use crate::requests;
use crate::reservation::TodayQueue;

pub use crate::prescription::MedicationsDraft;
pub use crate::requests::{ImagingOrder as ImagingDraft, LabOrder as LabsDraft};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TreatmentTab {
    #[default]
    Vitals,
    Diagnosis,
    Medications,
    Imaging,
    Labs,
}

impl TreatmentTab {
    pub const ALL: [TreatmentTab; 5] = [
        TreatmentTab::Vitals,
        TreatmentTab::Diagnosis,
        TreatmentTab::Medications,
        TreatmentTab::Imaging,
        TreatmentTab::Labs,
    ];
}

/// Diagnosis tab inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosisDraft {
    pub preliminary_diagnosis: String,
    pub final_diagnosis: String,
    pub diagnostic_details: String,
    pub icd_code: String,
    pub treatment_type: Option<TreatmentType>,
    pub treatment_details: String,
    pub follow_up_date: Option<NaiveDate>,
}

/// Persists the vitals tab. Supplied by whoever owns the panel.
pub trait VitalsSubmitter {
    fn submit_vitals(
        &self,
        api: &dyn HospitalApi,
        record: &VitalsRecord,
    ) -> Result<(), WorkflowError>;
}

/// Default submitter: the medical-record endpoint.
pub struct PostVitals;

impl VitalsSubmitter for PostVitals {
    fn submit_vitals(
        &self,
        api: &dyn HospitalApi,
        record: &VitalsRecord,
    ) -> Result<(), WorkflowError> {
        api.create_vitals(record)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    VitalsSaved(VitalsRecord),
    Submitted(DiagnosisSubmission),
}

pub struct TreatmentPanel {
    context: Option<ClinicalContext>,
    active_tab: TreatmentTab,
    pub vitals: VitalsDraft,
    pub diagnosis: DiagnosisDraft,
    pub medications: MedicationsDraft,
    pub imaging: ImagingDraft,
    pub labs: LabsDraft,
    vitals_submitter: Box<dyn VitalsSubmitter>,
    submitted: bool,
}

impl Default for TreatmentPanel {
    fn default() -> Self {
        Self {
            context: None,
            active_tab: TreatmentTab::default(),
            vitals: VitalsDraft::default(),
            diagnosis: DiagnosisDraft::default(),
            medications: MedicationsDraft::default(),
            imaging: ImagingDraft::default(),
            labs: LabsDraft::default(),
            vitals_submitter: Box::new(PostVitals),
            submitted: false,
        }
    }
}

impl TreatmentPanel {
    /// Panel with no patient selected yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Panel for the patient picked from the queue.
    pub fn for_reservation(reservation: &Reservation) -> Self {
        Self {
            context: Some(reservation.context()),
            ..Self::default()
        }
    }

    pub fn with_vitals_submitter(mut self, submitter: Box<dyn VitalsSubmitter>) -> Self {
        self.vitals_submitter = submitter;
        self
    }

    pub fn context(&self) -> Option<ClinicalContext> {
        self.context
    }

    pub fn active_tab(&self) -> TreatmentTab {
        self.active_tab
    }

    pub fn select_tab(&mut self, tab: TreatmentTab) {
        self.active_tab = tab;
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Context ids and treatment type must be present; anything missing
    /// blocks the action with an alert.
    fn blocking_checks(&self) -> Result<(ClinicalContext, TreatmentType), ValidationError> {
        let ctx = require("reservationId", self.context)?;
        require_id("reservationId", Some(ctx.reservation_id))?;
        require_id("patientId", Some(ctx.patient_id))?;
        require_id("doctorId", Some(ctx.doctor_id))?;
        let treatment_type = require("treatmentType", self.diagnosis.treatment_type)?;
        Ok((ctx, treatment_type))
    }

    /// Assemble the submission from tab state.
    pub fn build_submission(
        &self,
        action: TerminalAction,
    ) -> Result<DiagnosisSubmission, WorkflowError> {
        let (ctx, treatment_type) = self.blocking_checks().map_err(WorkflowError::Blocked)?;
        let draft = &self.diagnosis;
        let icd_code = match draft.icd_code.trim() {
            "" => String::new(),
            code => normalize_icd10(code)?,
        };
        let now = Utc::now();
        Ok(DiagnosisSubmission {
            reservation_id: ctx.reservation_id,
            diagnostic_info: DiagnosticInfo {
                preliminary_diagnosis: draft.preliminary_diagnosis.trim().to_string(),
                final_diagnosis: draft.final_diagnosis.trim().to_string(),
                diagnostic_details: draft.diagnostic_details.trim().to_string(),
                icd_code,
            },
            treatment_plan: TreatmentPlan {
                treatment_type,
                treatment_details: draft.treatment_details.trim().to_string(),
                follow_up_date: draft.follow_up_date,
            },
            actions: action.into(),
            metadata: SubmissionMetadata {
                patient_id: ctx.patient_id,
                doctor_id: ctx.doctor_id,
                created_at: now,
                updated_at: now,
            },
        })
    }

    /// Save & exit, request consultation or create appointment.
    pub fn handle_action(
        &mut self,
        api: &dyn HospitalApi,
        queue: &mut TodayQueue,
        action: TerminalAction,
    ) -> Result<ActionOutcome, WorkflowError> {
        if self.active_tab == TreatmentTab::Vitals {
            return self.save_vitals(api).map(ActionOutcome::VitalsSaved);
        }
        if self.submitted {
            return Err(WorkflowError::Blocked(ValidationError::AlreadySubmitted));
        }

        let submission = self.build_submission(action).inspect_err(|err| {
            tracing::warn!(error = %err, action = ?action, "Treatment submission blocked");
        })?;
        api.create_diagnosis(&submission)?;
        self.submitted = true;
        tracing::info!(
            reservation_id = submission.reservation_id,
            action = ?action,
            "Treatment submitted"
        );

        // The save went through; a stale queue is only logged.
        if let Err(err) = queue.reload(api) {
            tracing::warn!(error = %err, "Queue reload after submission failed");
        }
        queue.flip_refresh();
        Ok(ActionOutcome::Submitted(submission))
    }

    fn save_vitals(&self, api: &dyn HospitalApi) -> Result<VitalsRecord, WorkflowError> {
        let ctx = requests::check_context(self.context).map_err(WorkflowError::Blocked)?;
        if self.vitals.is_empty() {
            return Err(ValidationError::invalid("vitals", "enter at least one measurement").into());
        }
        let record = self.vitals.clone().into_record(ctx)?;
        self.vitals_submitter.submit_vitals(api, &record)?;
        tracing::info!(reservation_id = ctx.reservation_id, "Vitals saved");
        Ok(record)
    }

    fn side_action_context(&self) -> Result<ClinicalContext, WorkflowError> {
        requests::check_context(self.context).map_err(WorkflowError::Blocked)
    }

    /// Medications tab: write the prescription.
    pub fn prescribe(&self, api: &dyn HospitalApi) -> Result<Prescription, WorkflowError> {
        prescription::create_prescription(api, self.side_action_context()?, &self.medications)
    }

    /// Labs tab: send the lab order.
    pub fn order_labs(&self, api: &dyn HospitalApi) -> Result<LabRequest, WorkflowError> {
        requests::create_lab_request(api, self.side_action_context()?, &self.labs)
    }

    /// Imaging tab: send the imaging order.
    pub fn order_imaging(&self, api: &dyn HospitalApi) -> Result<ImagingRequest, WorkflowError> {
        requests::create_imaging_request(api, self.side_action_context()?, &self.imaging)
    }
}
