//! REST boundary to the hospital backend.
//!
//! Every workflow talks to the backend through [`HospitalApi`]. Two
//! implementations ship with the crate:
//! - [`HttpBackend`]: blocking reqwest client with bearer-token auth
//! - [`InMemoryBackend`]: server-authoritative in-process backend for tests and demos

pub mod error;
pub mod http;
pub mod memory;

pub use error::ApiError;
pub use http::HttpBackend;
pub use memory::InMemoryBackend;

use crate::models::{
    AccountRecord, AccountUpdate, DiagnosisSubmission, DoctorSummary, ImagingCompletion,
    ImagingRequest, LabCompletion, LabRequest, LoginRequest, LoginResponse, Medicine,
    NewImagingRequest, NewLabRequest, NewReservation, Prescription, PublicKey, RegisterRequest,
    RequestStatus, Reservation, ReservationUpdate, Specialty, StaffKind, StaffRegistration,
    UserProfile, VitalsRecord,
};

/// Supplies the bearer token attached to each request.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, handy for scripts and tests.
pub struct StaticToken(pub Option<String>);

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Endpoint paths of each staff family. Admins and doctors live under
/// `/admin`, technicians have a plain REST collection.
impl StaffKind {
    pub(crate) fn create_path(self) -> &'static str {
        match self {
            StaffKind::Admin => "/auth/admin/register",
            StaffKind::Doctor => "/auth/doctor/register",
            StaffKind::Technician => "/technicians",
        }
    }

    pub(crate) fn list_path(self) -> &'static str {
        match self {
            StaffKind::Admin => "/admin/all",
            StaffKind::Doctor => "/admin/doctor/all",
            StaffKind::Technician => "/technicians",
        }
    }

    /// `action` is `get`, `update` or `delete`; technicians use the HTTP verb alone.
    pub(crate) fn item_path(self, action: &str, id: i64) -> String {
        match self {
            StaffKind::Admin => format!("/admin/{action}/{id}"),
            StaffKind::Doctor => format!("/admin/doctor/{action}/{id}"),
            StaffKind::Technician => format!("/technicians/{id}"),
        }
    }
}

/// Operations the backend exposes. One method per endpoint; the staff
/// endpoints take the [`StaffKind`] whose collection they address.
pub trait HospitalApi {
    // ── Auth ────────────────────────────────────────────
    fn public_key(&self) -> Result<PublicKey, ApiError>;
    fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;
    fn me(&self) -> Result<UserProfile, ApiError>;
    fn register(&self, request: &RegisterRequest) -> Result<(), ApiError>;
    fn specialties(&self) -> Result<Vec<Specialty>, ApiError>;

    // ── Account management ──────────────────────────────
    fn create_staff(&self, kind: StaffKind, registration: &StaffRegistration)
        -> Result<(), ApiError>;
    fn list_staff(&self, kind: StaffKind) -> Result<Vec<AccountRecord>, ApiError>;
    fn get_staff(&self, kind: StaffKind, id: i64) -> Result<AccountRecord, ApiError>;
    fn update_staff(&self, kind: StaffKind, id: i64, update: &AccountUpdate)
        -> Result<(), ApiError>;
    fn delete_staff(&self, kind: StaffKind, id: i64) -> Result<(), ApiError>;
    fn patient_profile(&self, patient_id: i64) -> Result<AccountRecord, ApiError>;

    // ── Reservations ────────────────────────────────────
    fn doctors_by_specialty(&self, specialty_id: i64) -> Result<Vec<DoctorSummary>, ApiError>;
    fn create_reservation(&self, reservation: &NewReservation) -> Result<Reservation, ApiError>;
    fn get_reservation(&self, id: i64) -> Result<Reservation, ApiError>;
    fn list_reservations(&self) -> Result<Vec<Reservation>, ApiError>;
    fn update_reservation(&self, id: i64, update: &ReservationUpdate) -> Result<(), ApiError>;
    fn delete_reservation(&self, id: i64) -> Result<(), ApiError>;

    // ── Treatment panel ─────────────────────────────────
    fn create_diagnosis(&self, submission: &DiagnosisSubmission) -> Result<(), ApiError>;
    fn create_vitals(&self, record: &VitalsRecord) -> Result<(), ApiError>;

    // ── Prescriptions & medicines ───────────────────────
    fn create_prescription(&self, prescription: &Prescription) -> Result<Prescription, ApiError>;
    fn prescriptions_for_patient(&self, patient_id: i64) -> Result<Vec<Prescription>, ApiError>;
    fn medicines_for_doctor(&self) -> Result<Vec<Medicine>, ApiError>;

    // ── Lab requests ────────────────────────────────────
    fn create_lab_request(&self, request: &NewLabRequest) -> Result<LabRequest, ApiError>;
    fn lab_requests_for_patient(
        &self,
        patient_id: i64,
        status: Option<RequestStatus>,
    ) -> Result<Vec<LabRequest>, ApiError>;
    fn lab_worklist(&self, status: Option<RequestStatus>) -> Result<Vec<LabRequest>, ApiError>;
    fn complete_lab_request(&self, id: i64, completion: &LabCompletion) -> Result<(), ApiError>;

    // ── Imaging requests ────────────────────────────────
    fn create_imaging_request(
        &self,
        request: &NewImagingRequest,
    ) -> Result<ImagingRequest, ApiError>;
    fn imaging_requests_for_patient(&self, patient_id: i64)
        -> Result<Vec<ImagingRequest>, ApiError>;
    fn imaging_worklist(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ImagingRequest>, ApiError>;
    fn complete_imaging_request(
        &self,
        id: i64,
        completion: &ImagingCompletion,
    ) -> Result<(), ApiError>;
}
