//! In-process backend that behaves like the real server: it assigns ids,
//! statuses and timestamps, enforces the server-side rules, and records
//! every call so tests can assert on what was sent.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, NaiveTime, Utc};

use super::{ApiError, HospitalApi};
use crate::models::{
    AccountRecord, AccountUpdate, DiagnosisSubmission, DoctorSummary, ImagingCompletion,
    ImagingRequest, LabCompletion, LabRequest, LoginRequest, LoginResponse, Medicine,
    NewImagingRequest, NewLabRequest, NewReservation, Prescription, PublicKey, RegisterRequest,
    RequestStatus, Reservation, ReservationStatus, ReservationUpdate, Role, Specialty, StaffKind,
    StaffRegistration, UserProfile, VitalsRecord,
};

struct Account {
    password: String,
    role: Role,
    record: AccountRecord,
}

impl Account {
    fn new(id: i64, request: &RegisterRequest, role: Role) -> Self {
        let details = &request.details;
        Self {
            password: request.password.clone(),
            role,
            record: AccountRecord {
                id,
                username: request.username.clone(),
                name: details.name.clone(),
                surname: details.surname.clone(),
                email: Some(details.email.clone()),
                phone: Some(details.phone.clone()),
                address: Some(details.address.clone()),
                birth_date: Some(details.birth_date),
                blood_group: Some(details.blood_group.to_string()),
                national_id: Some(details.national_id.clone()),
                ..AccountRecord::default()
            },
        }
    }

    fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.record.id,
            username: self.record.username.clone(),
            role: self.role,
            name: Some(self.record.name.clone()),
            surname: Some(self.record.surname.clone()),
            email: self.record.email.clone(),
        }
    }
}

#[derive(Default)]
struct State {
    next_id: i64,
    auto_confirm: bool,
    accounts: Vec<Account>,
    signed_in: Option<i64>,
    specialties: Vec<Specialty>,
    doctors: Vec<(i64, DoctorSummary)>,
    medicines: Vec<Medicine>,
    reservations: BTreeMap<i64, Reservation>,
    diagnoses: Vec<DiagnosisSubmission>,
    vitals: Vec<VitalsRecord>,
    prescriptions: Vec<Prescription>,
    labs: BTreeMap<i64, LabRequest>,
    imaging: BTreeMap<i64, ImagingRequest>,
    calls: Vec<String>,
    fail_next: Option<ApiError>,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn reserve_id(&mut self, id: i64) {
        self.next_id = self.next_id.max(id);
    }

    fn account(&self, id: i64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.record.id == id)
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.accounts
            .iter()
            .any(|a| a.record.username == username && Some(a.record.id) != except)
    }

    fn register_account(&mut self, request: &RegisterRequest, role: Role) -> Result<i64, ApiError> {
        if self.username_taken(&request.username, None) {
            return Err(ApiError::Conflict("Username is already taken".into()));
        }
        let id = self.allocate_id();
        self.accounts.push(Account::new(id, request, role));
        Ok(id)
    }

    fn staff_member(&mut self, kind: StaffKind, id: i64) -> Result<&mut Account, ApiError> {
        self.accounts
            .iter_mut()
            .find(|a| a.record.id == id && a.role == kind.role())
            .ok_or_else(|| ApiError::NotFound(format!("{kind} {id} not found")))
    }

    fn doctor(&self, id: i64) -> Option<&DoctorSummary> {
        self.doctors.iter().map(|(_, d)| d).find(|d| d.id == id)
    }

    /// A doctor holds one live booking per date and time.
    fn ensure_slot_free(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        except: Option<i64>,
    ) -> Result<(), ApiError> {
        let taken = self.reservations.values().any(|r| {
            Some(r.id) != except
                && r.doctor_id == doctor_id
                && r.reservation_date == date
                && r.reservation_time == time
                && r.status != ReservationStatus::Cancelled
        });
        if taken {
            return Err(ApiError::Conflict("This time slot is already booked".into()));
        }
        Ok(())
    }
}

/// Server-authoritative backend held entirely in memory.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// New reservations come back CONFIRMED instead of PENDING.
    pub fn with_auto_confirm(self) -> Self {
        self.state().auto_confirm = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, then either hand out the state or the injected failure.
    fn enter(&self, call: String) -> Result<MutexGuard<'_, State>, ApiError> {
        let mut state = self.state();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    // ── Seeding ─────────────────────────────────────────

    pub fn seed_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
        name: &str,
        surname: &str,
    ) -> i64 {
        let mut state = self.state();
        let id = state.allocate_id();
        state.accounts.push(Account {
            password: password.to_string(),
            role,
            record: AccountRecord {
                id,
                username: username.to_string(),
                name: name.to_string(),
                surname: surname.to_string(),
                ..AccountRecord::default()
            },
        });
        id
    }

    pub fn seed_specialty(&self, display_name: &str) -> i64 {
        let mut state = self.state();
        let id = state.allocate_id();
        state.specialties.push(Specialty {
            id,
            display_name: display_name.to_string(),
        });
        id
    }

    /// Doctor listed under `specialty_id`. The id doubles as the doctor's user id.
    pub fn seed_doctor(&self, name: &str, surname: &str, specialty_id: i64) -> i64 {
        let mut state = self.state();
        let id = state.allocate_id();
        let speciality = state
            .specialties
            .iter()
            .find(|s| s.id == specialty_id)
            .map(|s| s.display_name.clone())
            .unwrap_or_default();
        state.doctors.push((
            specialty_id,
            DoctorSummary {
                id,
                name: name.to_string(),
                surname: surname.to_string(),
                speciality,
            },
        ));
        id
    }

    pub fn seed_medicine(&self, name: &str, form: Option<&str>) -> i64 {
        let mut state = self.state();
        let id = state.allocate_id();
        state.medicines.push(Medicine {
            id,
            name: name.to_string(),
            form: form.map(String::from),
        });
        id
    }

    /// Insert a reservation as-is, keeping its id.
    pub fn seed_reservation(&self, reservation: Reservation) {
        let mut state = self.state();
        state.reserve_id(reservation.id);
        state.reservations.insert(reservation.id, reservation);
    }

    /// The next call fails with `err` (and is still recorded).
    pub fn fail_next(&self, err: ApiError) {
        self.state().fail_next = Some(err);
    }

    /// Drop the signed-in user, as if the token expired server-side.
    pub fn expire_session(&self) {
        self.state().signed_in = None;
    }

    // ── Inspection ──────────────────────────────────────

    /// Every call so far, as `"METHOD /path"`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|c| c.as_str() == call).count()
    }

    pub fn diagnoses(&self) -> Vec<DiagnosisSubmission> {
        self.state().diagnoses.clone()
    }

    pub fn vitals_records(&self) -> Vec<VitalsRecord> {
        self.state().vitals.clone()
    }

    pub fn reservations(&self) -> Vec<Reservation> {
        self.state().reservations.values().cloned().collect()
    }

    pub fn prescriptions(&self) -> Vec<Prescription> {
        self.state().prescriptions.clone()
    }

    pub fn lab_requests(&self) -> Vec<LabRequest> {
        self.state().labs.values().cloned().collect()
    }

    pub fn imaging_requests(&self) -> Vec<ImagingRequest> {
        self.state().imaging.values().cloned().collect()
    }
}

fn filter_status<T: Clone>(
    rows: impl Iterator<Item = T>,
    status: Option<RequestStatus>,
    status_of: impl Fn(&T) -> RequestStatus,
) -> Vec<T> {
    rows.filter(|row| status.map_or(true, |s| status_of(row) == s)).collect()
}

impl HospitalApi for InMemoryBackend {
    fn public_key(&self) -> Result<PublicKey, ApiError> {
        self.enter("GET /auth/public-key".into())?;
        Ok(PublicKey {
            public_key: "-----BEGIN PUBLIC KEY-----\nMEMORY\n-----END PUBLIC KEY-----".into(),
        })
    }

    fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let mut state = self.enter("POST /auth/login".into())?;
        let profile = state
            .accounts
            .iter()
            .find(|a| a.record.username == request.username && a.password == request.password)
            .map(Account::profile)
            .ok_or_else(|| ApiError::BadRequest("Invalid username or password".into()))?;
        state.signed_in = Some(profile.id);
        Ok(LoginResponse {
            username: profile.username,
            id: profile.id,
            role: profile.role,
            token: format!("memory-token-{}", profile.id),
            message: Some("Login successful".into()),
        })
    }

    fn me(&self) -> Result<UserProfile, ApiError> {
        let state = self.enter("GET /auth/me".into())?;
        state
            .signed_in
            .and_then(|id| state.account(id).map(Account::profile))
            .ok_or(ApiError::Unauthorized)
    }

    fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let mut state = self.enter("POST /auth/register".into())?;
        state.register_account(request, Role::Patient)?;
        Ok(())
    }

    fn specialties(&self) -> Result<Vec<Specialty>, ApiError> {
        Ok(self.enter("GET /auth/allspecialties".into())?.specialties.clone())
    }

    fn create_staff(
        &self,
        kind: StaffKind,
        registration: &StaffRegistration,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(format!("POST {}", kind.create_path()))?;
        let id = state.register_account(&registration.account, kind.role())?;
        if let Some(account) = state.accounts.iter_mut().find(|a| a.record.id == id) {
            account.record.speciality = registration.speciality.clone();
            account.record.diploma_no = registration.diploma_no.clone();
            account.record.department = registration.department.clone();
            account.record.specialization = registration.specialization.clone();
        }
        // New doctors become bookable under their speciality.
        if kind == StaffKind::Doctor {
            let speciality = registration.speciality.clone().unwrap_or_default();
            let specialty_id = state
                .specialties
                .iter()
                .find(|s| s.display_name == speciality)
                .map(|s| s.id);
            if let Some(specialty_id) = specialty_id {
                let details = &registration.account.details;
                let summary = DoctorSummary {
                    id,
                    name: details.name.clone(),
                    surname: details.surname.clone(),
                    speciality,
                };
                state.doctors.push((specialty_id, summary));
            }
        }
        Ok(())
    }

    fn list_staff(&self, kind: StaffKind) -> Result<Vec<AccountRecord>, ApiError> {
        let state = self.enter(format!("GET {}", kind.list_path()))?;
        Ok(state
            .accounts
            .iter()
            .filter(|a| a.role == kind.role())
            .map(|a| a.record.clone())
            .collect())
    }

    fn get_staff(&self, kind: StaffKind, id: i64) -> Result<AccountRecord, ApiError> {
        let mut state = self.enter(format!("GET {}", kind.item_path("get", id)))?;
        Ok(state.staff_member(kind, id)?.record.clone())
    }

    fn update_staff(
        &self,
        kind: StaffKind,
        id: i64,
        update: &AccountUpdate,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(format!("PUT {}", kind.item_path("update", id)))?;
        if let Some(username) = &update.username {
            if state.username_taken(username, Some(id)) {
                return Err(ApiError::Conflict("Username is already taken".into()));
            }
        }
        let account = state.staff_member(kind, id)?;
        update.apply_to(&mut account.record);
        if let Some(password) = &update.password {
            account.password.clone_from(password);
        }
        let record = account.record.clone();
        if let Some((_, doctor)) = state.doctors.iter_mut().find(|(_, d)| d.id == id) {
            doctor.name = record.name;
            doctor.surname = record.surname;
        }
        Ok(())
    }

    fn delete_staff(&self, kind: StaffKind, id: i64) -> Result<(), ApiError> {
        let mut state = self.enter(format!("DELETE {}", kind.item_path("delete", id)))?;
        state.staff_member(kind, id)?;
        state.accounts.retain(|a| a.record.id != id);
        state.doctors.retain(|(_, d)| d.id != id);
        if state.signed_in == Some(id) {
            state.signed_in = None;
        }
        Ok(())
    }

    fn patient_profile(&self, patient_id: i64) -> Result<AccountRecord, ApiError> {
        let state = self.enter(format!("GET /patient/get/{patient_id}"))?;
        state
            .account(patient_id)
            .filter(|a| a.role == Role::Patient)
            .map(|a| a.record.clone())
            .ok_or_else(|| ApiError::NotFound(format!("Patient {patient_id} not found")))
    }

    fn doctors_by_specialty(&self, specialty_id: i64) -> Result<Vec<DoctorSummary>, ApiError> {
        let state = self.enter(format!("GET /reservations/getall/doctors/{specialty_id}"))?;
        Ok(state
            .doctors
            .iter()
            .filter(|(sid, _)| *sid == specialty_id)
            .map(|(_, d)| d.clone())
            .collect())
    }

    fn create_reservation(&self, reservation: &NewReservation) -> Result<Reservation, ApiError> {
        let mut state = self.enter("POST /reservations/create".into())?;
        state.ensure_slot_free(
            reservation.doctor_id,
            reservation.reservation_date,
            reservation.reservation_time,
            None,
        )?;

        let id = state.allocate_id();
        let status = if state.auto_confirm {
            ReservationStatus::Confirmed
        } else {
            ReservationStatus::Pending
        };
        let doctor = state.doctor(reservation.doctor_id).cloned();
        let patient = state.account(reservation.patient_id).map(|a| a.record.clone());
        let created = Reservation {
            id,
            patient_id: reservation.patient_id,
            doctor_id: reservation.doctor_id,
            speciality: reservation.speciality.clone(),
            reservation_date: reservation.reservation_date,
            reservation_time: reservation.reservation_time,
            status,
            doctor_name: doctor.as_ref().map(|d| d.name.clone()),
            doctor_surname: doctor.as_ref().map(|d| d.surname.clone()),
            patient_name: patient.as_ref().map(|p| p.name.clone()),
            patient_surname: patient.as_ref().map(|p| p.surname.clone()),
        };
        state.reservations.insert(id, created.clone());
        Ok(created)
    }

    fn get_reservation(&self, id: i64) -> Result<Reservation, ApiError> {
        let state = self.enter(format!("GET /reservations/get/{id}"))?;
        state
            .reservations
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Reservation {id} not found")))
    }

    fn list_reservations(&self) -> Result<Vec<Reservation>, ApiError> {
        let state = self.enter("GET /reservations/getall".into())?;
        Ok(state.reservations.values().cloned().collect())
    }

    fn update_reservation(&self, id: i64, update: &ReservationUpdate) -> Result<(), ApiError> {
        let mut state = self.enter(format!("PUT /reservations/update/{id}"))?;
        let current = state
            .reservations
            .get(&id)
            .ok_or_else(|| ApiError::NotFound(format!("Reservation {id} not found")))?;
        if let Some(next) = update.status {
            if !current.status.can_transition_to(next) {
                return Err(ApiError::BadRequest(format!(
                    "Cannot change status from {} to {}",
                    current.status, next
                )));
            }
        }
        let mut updated = current.clone();
        update.apply_to(&mut updated);
        let moved = updated.reservation_date != current.reservation_date
            || updated.reservation_time != current.reservation_time;
        if moved && updated.status != ReservationStatus::Cancelled {
            state.ensure_slot_free(
                updated.doctor_id,
                updated.reservation_date,
                updated.reservation_time,
                Some(id),
            )?;
        }
        state.reservations.insert(id, updated);
        Ok(())
    }

    fn delete_reservation(&self, id: i64) -> Result<(), ApiError> {
        let mut state = self.enter(format!("DELETE /reservations/delete/{id}"))?;
        state
            .reservations
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("Reservation {id} not found")))
    }

    fn create_diagnosis(&self, submission: &DiagnosisSubmission) -> Result<(), ApiError> {
        let mut state = self.enter("POST /doctor/diagnoses/create".into())?;
        let reservation = state
            .reservations
            .get_mut(&submission.reservation_id)
            .ok_or_else(|| {
                ApiError::NotFound(format!("Reservation {} not found", submission.reservation_id))
            })?;
        reservation.status = ReservationStatus::Completed;
        state.diagnoses.push(submission.clone());
        Ok(())
    }

    fn create_vitals(&self, record: &VitalsRecord) -> Result<(), ApiError> {
        let mut state = self.enter("POST /medical-record/create/appointment".into())?;
        state.vitals.push(record.clone());
        Ok(())
    }

    fn create_prescription(&self, prescription: &Prescription) -> Result<Prescription, ApiError> {
        let mut state = self.enter("POST /prescriptions/create".into())?;
        let mut stored = prescription.clone();
        stored.id = Some(state.allocate_id());
        state.prescriptions.push(stored.clone());
        Ok(stored)
    }

    fn prescriptions_for_patient(&self, patient_id: i64) -> Result<Vec<Prescription>, ApiError> {
        let state = self.enter(format!("GET /prescriptions/patient/{patient_id}"))?;
        Ok(state
            .prescriptions
            .iter()
            .filter(|p| p.patient_id == patient_id)
            .cloned()
            .collect())
    }

    fn medicines_for_doctor(&self) -> Result<Vec<Medicine>, ApiError> {
        Ok(self.enter("GET /medicine/getAllByDoctorSpeciality".into())?.medicines.clone())
    }

    fn create_lab_request(&self, request: &NewLabRequest) -> Result<LabRequest, ApiError> {
        let mut state = self.enter("POST /lab-requests/create".into())?;
        let id = state.allocate_id();
        let created = LabRequest {
            id,
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            reservation_id: Some(request.reservation_id),
            test_panel: request.test_panel.clone(),
            priority: request.priority,
            fasting_status: request.fasting_status,
            notes: request.notes.clone(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            results: None,
            technician_id: None,
            test_pdfs: Vec::new(),
        };
        state.labs.insert(id, created.clone());
        Ok(created)
    }

    fn lab_requests_for_patient(
        &self,
        patient_id: i64,
        status: Option<RequestStatus>,
    ) -> Result<Vec<LabRequest>, ApiError> {
        let state = self.enter(format!("GET /lab-requests/patient/{patient_id}/all"))?;
        let rows = state.labs.values().filter(|r| r.patient_id == patient_id).cloned();
        Ok(filter_status(rows, status, |r| r.status))
    }

    fn lab_worklist(&self, status: Option<RequestStatus>) -> Result<Vec<LabRequest>, ApiError> {
        let state = self.enter("GET /technicians/lab-requests/all".into())?;
        Ok(filter_status(state.labs.values().cloned(), status, |r| r.status))
    }

    fn complete_lab_request(&self, id: i64, completion: &LabCompletion) -> Result<(), ApiError> {
        let mut state = self.enter(format!("PUT /technicians/lab-requests/{id}/complete"))?;
        let request = state
            .labs
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound(format!("Lab request {id} not found")))?;
        if !request.status.can_transition_to(completion.status) {
            return Err(ApiError::Conflict(format!(
                "Lab request {id} is already {}",
                request.status
            )));
        }
        request.status = completion.status;
        request.completed_at = Some(completion.completed_at);
        request.results = Some(completion.results.clone());
        request.technician_id = Some(completion.technician_id);
        request.test_pdfs = completion.test_pdfs.clone();
        if !completion.notes.is_empty() {
            request.notes = completion.notes.clone();
        }
        Ok(())
    }

    fn create_imaging_request(
        &self,
        request: &NewImagingRequest,
    ) -> Result<ImagingRequest, ApiError> {
        let mut state = self.enter("POST /imaging-requests/create".into())?;
        let id = state.allocate_id();
        let created = ImagingRequest {
            id,
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            reservation_id: Some(request.reservation_id),
            imaging_type: request.imaging_type,
            body_part: request.body_part.clone(),
            priority: request.priority,
            notes: request.notes.clone(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            findings: None,
            technician_id: None,
            image_data: None,
        };
        state.imaging.insert(id, created.clone());
        Ok(created)
    }

    fn imaging_requests_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<ImagingRequest>, ApiError> {
        let state = self.enter(format!("GET /imaging-requests/patient/{patient_id}"))?;
        Ok(state
            .imaging
            .values()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect())
    }

    fn imaging_worklist(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ImagingRequest>, ApiError> {
        let state = self.enter("GET /technicians/imaging-requests/all".into())?;
        Ok(filter_status(state.imaging.values().cloned(), status, |r| r.status))
    }

    fn complete_imaging_request(
        &self,
        id: i64,
        completion: &ImagingCompletion,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(format!("PUT /technicians/imaging-requests/{id}/complete"))?;
        let request = state
            .imaging
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound(format!("Imaging request {id} not found")))?;
        if !request.status.can_transition_to(completion.status) {
            return Err(ApiError::Conflict(format!(
                "Imaging request {id} is already {}",
                request.status
            )));
        }
        request.status = completion.status;
        request.completed_at = Some(completion.completed_at);
        request.findings = Some(completion.findings.clone());
        request.technician_id = Some(completion.technician_id);
        request.image_data = Some(completion.image_data.clone());
        if !completion.notes.is_empty() {
            request.notes = completion.notes.clone();
        }
        Ok(())
    }
}
