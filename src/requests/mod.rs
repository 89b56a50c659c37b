//! Lab and imaging requests: the doctor orders, the technician completes.
//!
//! A request is PENDING until a technician completes it; COMPLETED and
//! CANCELLED are final. Creation is fire-and-refresh: after the POST the
//! patient's request lists are fetched again.

pub mod attachment;

pub use attachment::{Attachment, AttachmentKind};

use chrono::Utc;

use crate::api::HospitalApi;
use crate::error::WorkflowError;
use crate::models::validation::{require, require_id, require_text};
use crate::models::{
    ClinicalContext, FastingStatus, ImagingCompletion, ImagingRequest, ImagingType, LabCompletion,
    LabPanel, LabPdf, LabRequest, NewImagingRequest, NewLabRequest, Priority, RequestStatus,
    ValidationError,
};

/// Inputs of the lab tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabOrder {
    pub panels: Vec<LabPanel>,
    pub priority: Priority,
    pub fasting_status: FastingStatus,
    pub notes: String,
}

impl Default for LabOrder {
    fn default() -> Self {
        Self {
            panels: Vec::new(),
            priority: Priority::Normal,
            fasting_status: FastingStatus::NotRequired,
            notes: String::new(),
        }
    }
}

/// Inputs of the imaging tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagingOrder {
    pub imaging_type: Option<ImagingType>,
    pub body_part: String,
    pub priority: Priority,
    pub notes: String,
}

impl Default for ImagingOrder {
    fn default() -> Self {
        Self {
            imaging_type: None,
            body_part: String::new(),
            priority: Priority::Normal,
            notes: String::new(),
        }
    }
}

pub(crate) fn check_context(
    ctx: Option<ClinicalContext>,
) -> Result<ClinicalContext, ValidationError> {
    let ctx = require("reservationId", ctx)?;
    require_id("reservationId", Some(ctx.reservation_id))?;
    require_id("patientId", Some(ctx.patient_id))?;
    require_id("doctorId", Some(ctx.doctor_id))?;
    Ok(ctx)
}

impl LabOrder {
    pub fn validate(&self, ctx: ClinicalContext) -> Result<NewLabRequest, ValidationError> {
        let ctx = check_context(Some(ctx))?;
        let mut panels: Vec<LabPanel> = Vec::with_capacity(self.panels.len());
        for panel in &self.panels {
            if !panels.contains(panel) {
                panels.push(*panel);
            }
        }
        if panels.is_empty() {
            return Err(ValidationError::invalid("testPanel", "select at least one test"));
        }
        Ok(NewLabRequest {
            patient_id: ctx.patient_id,
            doctor_id: ctx.doctor_id,
            reservation_id: ctx.reservation_id,
            test_panel: panels,
            priority: self.priority,
            fasting_status: self.fasting_status,
            notes: self.notes.trim().to_string(),
        })
    }
}

impl ImagingOrder {
    pub fn validate(&self, ctx: ClinicalContext) -> Result<NewImagingRequest, ValidationError> {
        let ctx = check_context(Some(ctx))?;
        Ok(NewImagingRequest {
            patient_id: ctx.patient_id,
            doctor_id: ctx.doctor_id,
            reservation_id: ctx.reservation_id,
            imaging_type: require("imagingType", self.imaging_type)?,
            body_part: require_text("bodyPart", &self.body_part)?,
            priority: self.priority,
            notes: self.notes.trim().to_string(),
        })
    }
}

/// One patient's lab and imaging history.
#[derive(Debug, Clone)]
pub struct PatientRequests {
    patient_id: i64,
    status_filter: Option<RequestStatus>,
    labs: Vec<LabRequest>,
    imaging: Vec<ImagingRequest>,
}

impl PatientRequests {
    pub fn new(patient_id: i64) -> Self {
        Self {
            patient_id,
            status_filter: None,
            labs: Vec::new(),
            imaging: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: Option<RequestStatus>) -> Self {
        self.status_filter = status;
        self
    }

    pub fn labs(&self) -> &[LabRequest] {
        &self.labs
    }

    pub fn imaging(&self) -> &[ImagingRequest] {
        &self.imaging
    }

    pub fn refresh(&mut self, api: &dyn HospitalApi) -> Result<(), WorkflowError> {
        self.labs = api.lab_requests_for_patient(self.patient_id, self.status_filter)?;
        let imaging = api.imaging_requests_for_patient(self.patient_id)?;
        self.imaging = match self.status_filter {
            Some(status) => imaging.into_iter().filter(|r| r.status == status).collect(),
            None => imaging,
        };
        Ok(())
    }

    pub fn create_lab_request(
        &mut self,
        api: &dyn HospitalApi,
        ctx: ClinicalContext,
        order: &LabOrder,
    ) -> Result<LabRequest, WorkflowError> {
        let created = create_lab_request(api, ctx, order)?;
        self.refresh(api)?;
        Ok(created)
    }

    pub fn create_imaging_request(
        &mut self,
        api: &dyn HospitalApi,
        ctx: ClinicalContext,
        order: &ImagingOrder,
    ) -> Result<ImagingRequest, WorkflowError> {
        let created = create_imaging_request(api, ctx, order)?;
        self.refresh(api)?;
        Ok(created)
    }
}

pub fn create_lab_request(
    api: &dyn HospitalApi,
    ctx: ClinicalContext,
    order: &LabOrder,
) -> Result<LabRequest, WorkflowError> {
    let request = order.validate(ctx).inspect_err(|err| {
        tracing::warn!(error = %err, "Lab request rejected");
    })?;
    let created = api.create_lab_request(&request)?;
    tracing::info!(
        request_id = created.id,
        patient_id = created.patient_id,
        panels = created.test_panel.len(),
        priority = %created.priority,
        "Lab request created"
    );
    Ok(created)
}

pub fn create_imaging_request(
    api: &dyn HospitalApi,
    ctx: ClinicalContext,
    order: &ImagingOrder,
) -> Result<ImagingRequest, WorkflowError> {
    let request = order.validate(ctx).inspect_err(|err| {
        tracing::warn!(error = %err, "Imaging request rejected");
    })?;
    let created = api.create_imaging_request(&request)?;
    tracing::info!(
        request_id = created.id,
        patient_id = created.patient_id,
        imaging_type = %created.imaging_type,
        "Imaging request created"
    );
    Ok(created)
}

/// What the technician enters to close a lab request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabResult {
    pub results: String,
    pub notes: String,
    pub pdfs: Vec<LabPdf>,
}

/// What the technician enters to close an imaging request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagingResult {
    pub image: Option<Attachment>,
    pub findings: String,
    pub notes: String,
}

/// Technician worklists.
#[derive(Debug, Clone)]
pub struct TechnicianDesk {
    technician_id: i64,
    status_filter: Option<RequestStatus>,
    labs: Vec<LabRequest>,
    imaging: Vec<ImagingRequest>,
}

impl TechnicianDesk {
    pub fn new(technician_id: i64) -> Self {
        Self {
            technician_id,
            status_filter: None,
            labs: Vec::new(),
            imaging: Vec::new(),
        }
    }

    pub fn set_status_filter(&mut self, status: Option<RequestStatus>) {
        self.status_filter = status;
    }

    pub fn labs(&self) -> &[LabRequest] {
        &self.labs
    }

    pub fn imaging(&self) -> &[ImagingRequest] {
        &self.imaging
    }

    pub fn refresh(&mut self, api: &dyn HospitalApi) -> Result<(), WorkflowError> {
        self.labs = api.lab_worklist(self.status_filter)?;
        self.imaging = api.imaging_worklist(self.status_filter)?;
        Ok(())
    }

    pub fn complete_lab(
        &mut self,
        api: &dyn HospitalApi,
        id: i64,
        result: LabResult,
    ) -> Result<(), WorkflowError> {
        let technician_id = require_id("technicianId", Some(self.technician_id))?;
        ensure_pending(self.lab_status(api, id)?)?;
        let results = result.results.trim().to_string();
        if results.is_empty() && result.pdfs.is_empty() {
            return Err(ValidationError::missing("results").into());
        }

        let completion = LabCompletion {
            results,
            notes: result.notes.trim().to_string(),
            technician_id,
            test_pdfs: result.pdfs,
            status: RequestStatus::Completed,
            completed_at: Utc::now(),
        };
        api.complete_lab_request(id, &completion)?;
        tracing::info!(
            request_id = id,
            technician_id,
            pdfs = completion.test_pdfs.len(),
            "Lab request completed"
        );
        self.refresh(api)
    }

    pub fn complete_imaging(
        &mut self,
        api: &dyn HospitalApi,
        id: i64,
        result: ImagingResult,
    ) -> Result<(), WorkflowError> {
        let technician_id = require_id("technicianId", Some(self.technician_id))?;
        ensure_pending(self.imaging_status(api, id)?)?;
        let image = require("imageData", result.image)?;

        let completion = ImagingCompletion {
            image_data: image.data,
            findings: result.findings.trim().to_string(),
            notes: result.notes.trim().to_string(),
            technician_id,
            status: RequestStatus::Completed,
            completed_at: Utc::now(),
        };
        api.complete_imaging_request(id, &completion)?;
        tracing::info!(request_id = id, technician_id, "Imaging request completed");
        self.refresh(api)
    }

    /// Status from the loaded worklist, or from the unfiltered one when the
    /// request is hidden by the current filter.
    fn lab_status(&self, api: &dyn HospitalApi, id: i64) -> Result<RequestStatus, WorkflowError> {
        if let Some(request) = self.labs.iter().find(|r| r.id == id) {
            return Ok(request.status);
        }
        tracing::debug!(request_id = id, "Lab request not in worklist, asking backend");
        api.lab_worklist(None)?
            .into_iter()
            .find(|r| r.id == id)
            .map(|r| r.status)
            .ok_or_else(|| WorkflowError::NotFound(format!("lab request {id}")))
    }

    fn imaging_status(
        &self,
        api: &dyn HospitalApi,
        id: i64,
    ) -> Result<RequestStatus, WorkflowError> {
        if let Some(request) = self.imaging.iter().find(|r| r.id == id) {
            return Ok(request.status);
        }
        tracing::debug!(request_id = id, "Imaging request not in worklist, asking backend");
        api.imaging_worklist(None)?
            .into_iter()
            .find(|r| r.id == id)
            .map(|r| r.status)
            .ok_or_else(|| WorkflowError::NotFound(format!("imaging request {id}")))
    }
}

fn ensure_pending(status: RequestStatus) -> Result<(), ValidationError> {
    if status.can_transition_to(RequestStatus::Completed) {
        Ok(())
    } else {
        Err(ValidationError::transition(status, RequestStatus::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryBackend;

    const PDF: &[u8] = b"%PDF-1.7\n%%EOF";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F'];

    fn ctx() -> ClinicalContext {
        ClinicalContext { reservation_id: 3, patient_id: 40, doctor_id: 12 }
    }

    fn cbc_order() -> LabOrder {
        LabOrder {
            panels: vec![LabPanel::CompleteBloodCount, LabPanel::Crp, LabPanel::Crp],
            priority: Priority::Urgent,
            fasting_status: FastingStatus::Fasting,
            notes: " before noon ".into(),
        }
    }

    #[test]
    fn created_lab_request_appears_pending_after_refetch() {
        let api = InMemoryBackend::new();
        let mut history = PatientRequests::new(40);
        let created = history.create_lab_request(&api, ctx(), &cbc_order()).unwrap();

        assert_eq!(history.labs().len(), 1);
        let row = &history.labs()[0];
        assert_eq!(row.id, created.id);
        assert_eq!(row.status, RequestStatus::Pending);
        assert_eq!(row.test_panel, vec![LabPanel::CompleteBloodCount, LabPanel::Crp]);
        assert_eq!(row.notes, "before noon");
    }

    #[test]
    fn created_imaging_request_appears_pending_after_refetch() {
        let api = InMemoryBackend::new();
        let mut history = PatientRequests::new(40);
        let order = ImagingOrder {
            imaging_type: Some(ImagingType::XRay),
            body_part: "Chest".into(),
            ..Default::default()
        };
        history.create_imaging_request(&api, ctx(), &order).unwrap();
        assert_eq!(history.imaging().len(), 1);
        assert_eq!(history.imaging()[0].status, RequestStatus::Pending);
    }

    #[test]
    fn lab_order_needs_a_panel() {
        let api = InMemoryBackend::new();
        let err = create_lab_request(&api, ctx(), &LabOrder::default()).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(ref v) if v.field() == Some("testPanel")));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn imaging_order_needs_type_and_body_part() {
        let api = InMemoryBackend::new();
        let no_type = ImagingOrder { body_part: "Knee".into(), ..Default::default() };
        assert!(create_imaging_request(&api, ctx(), &no_type).is_err());
        let no_part = ImagingOrder { imaging_type: Some(ImagingType::Mri), ..Default::default() };
        assert!(create_imaging_request(&api, ctx(), &no_part).is_err());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn order_without_context_is_rejected() {
        let bad = ClinicalContext { reservation_id: 0, ..ctx() };
        assert!(cbc_order().validate(bad).is_err());
    }

    #[test]
    fn completing_one_lab_request_leaves_others_pending() {
        let api = InMemoryBackend::new();
        let first = create_lab_request(&api, ctx(), &cbc_order()).unwrap();
        let second = create_lab_request(&api, ctx(), &cbc_order()).unwrap();

        let mut desk = TechnicianDesk::new(9);
        desk.refresh(&api).unwrap();
        let pdf = Attachment::from_bytes("cbc.pdf", PDF, AttachmentKind::LabPdf)
            .unwrap()
            .into_lab_pdf(LabPanel::CompleteBloodCount);
        desk.complete_lab(
            &api,
            first.id,
            LabResult { results: "WBC 7.1".into(), notes: String::new(), pdfs: vec![pdf] },
        )
        .unwrap();

        let done = desk.labs().iter().find(|r| r.id == first.id).unwrap();
        assert_eq!(done.status, RequestStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.technician_id, Some(9));
        assert_eq!(done.test_pdfs.len(), 1);

        let other = desk.labs().iter().find(|r| r.id == second.id).unwrap();
        assert_eq!(other.status, RequestStatus::Pending);
        assert!(other.completed_at.is_none());
    }

    #[test]
    fn completed_request_cannot_be_completed_again() {
        let api = InMemoryBackend::new();
        let req = create_lab_request(&api, ctx(), &cbc_order()).unwrap();
        let mut desk = TechnicianDesk::new(9);
        desk.refresh(&api).unwrap();
        let result = LabResult { results: "ok".into(), ..Default::default() };
        desk.complete_lab(&api, req.id, result.clone()).unwrap();
        let calls = api.calls().len();

        let err = desk.complete_lab(&api, req.id, result).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::IllegalTransition { .. })
        ));
        assert_eq!(api.calls().len(), calls);
    }

    #[test]
    fn lab_completion_needs_results_or_pdf() {
        let api = InMemoryBackend::new();
        let req = create_lab_request(&api, ctx(), &cbc_order()).unwrap();
        let mut desk = TechnicianDesk::new(9);
        desk.refresh(&api).unwrap();
        assert!(desk.complete_lab(&api, req.id, LabResult::default()).is_err());
    }

    #[test]
    fn imaging_completion_requires_image() {
        let api = InMemoryBackend::new();
        let order = ImagingOrder {
            imaging_type: Some(ImagingType::Ultrasound),
            body_part: "Abdomen".into(),
            ..Default::default()
        };
        let req = create_imaging_request(&api, ctx(), &order).unwrap();
        let mut desk = TechnicianDesk::new(9);
        desk.refresh(&api).unwrap();

        let no_image = ImagingResult { findings: "normal".into(), ..Default::default() };
        let err = desk.complete_imaging(&api, req.id, no_image).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(ref v) if v.field() == Some("imageData")));

        let image = Attachment::from_bytes("abdomen.jpg", JPEG, AttachmentKind::Image).unwrap();
        desk.complete_imaging(
            &api,
            req.id,
            ImagingResult { image: Some(image), findings: "normal".into(), notes: String::new() },
        )
        .unwrap();
        assert_eq!(desk.imaging()[0].status, RequestStatus::Completed);
        assert!(desk.imaging()[0].image_data.is_some());
    }

    #[test]
    fn worklist_status_filter() {
        let api = InMemoryBackend::new();
        let a = create_lab_request(&api, ctx(), &cbc_order()).unwrap();
        create_lab_request(&api, ctx(), &cbc_order()).unwrap();
        let mut desk = TechnicianDesk::new(9);
        desk.refresh(&api).unwrap();
        desk.complete_lab(&api, a.id, LabResult { results: "ok".into(), ..Default::default() })
            .unwrap();

        desk.set_status_filter(Some(RequestStatus::Pending));
        desk.refresh(&api).unwrap();
        assert_eq!(desk.labs().len(), 1);
        assert!(desk.labs().iter().all(|r| r.status == RequestStatus::Pending));
    }

    #[test]
    fn unknown_request_is_not_found() {
        let api = InMemoryBackend::new();
        let mut desk = TechnicianDesk::new(9);
        assert!(matches!(
            desk.complete_lab(&api, 77, LabResult::default()),
            Err(WorkflowError::NotFound(_))
        ));
        assert!(matches!(
            desk.complete_imaging(&api, 78, ImagingResult::default()),
            Err(WorkflowError::NotFound(_))
        ));
        assert_eq!(api.count_calls("GET /technicians/lab-requests/all"), 1);
    }

    #[test]
    fn request_hidden_by_filter_is_looked_up() {
        let api = InMemoryBackend::new();
        let req = create_lab_request(&api, ctx(), &cbc_order()).unwrap();
        let mut desk = TechnicianDesk::new(9);
        desk.set_status_filter(Some(RequestStatus::Completed));
        desk.refresh(&api).unwrap();
        assert!(desk.labs().is_empty());

        desk.complete_lab(&api, req.id, LabResult { results: "ok".into(), ..Default::default() })
            .unwrap();
        assert_eq!(desk.labs().len(), 1);
        assert_eq!(desk.labs()[0].status, RequestStatus::Completed);

        let err = desk
            .complete_lab(&api, req.id, LabResult { results: "again".into(), ..Default::default() })
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::IllegalTransition { .. })
        ));
    }
}
