//! Reservation workflow: booking, rescheduling, status changes and the
//! client-side listing every dashboard table sits on.
//!
//! Every successful mutation is followed by a full refetch of the list, so
//! what the user sees is always what the server holds.

pub mod queue;

pub use queue::TodayQueue;

use chrono::{NaiveDate, NaiveTime};

use crate::api::HospitalApi;
use crate::error::WorkflowError;
use crate::models::validation::{require, require_id, require_text};
use crate::models::{
    DoctorSummary, NewReservation, Reservation, ReservationStatus, ReservationUpdate,
    ValidationError,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Inputs of the "new appointment" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationForm {
    pub speciality: String,
    pub doctor_id: Option<i64>,
    pub reservation_date: Option<NaiveDate>,
    pub reservation_time: Option<NaiveTime>,
}

impl ReservationForm {
    pub fn validate(&self, patient_id: i64) -> Result<NewReservation, ValidationError> {
        Ok(NewReservation {
            speciality: require_text("speciality", &self.speciality)?,
            doctor_id: require_id("doctorId", self.doctor_id)?,
            patient_id: require_id("patientId", Some(patient_id))?,
            reservation_date: require("reservationDate", self.reservation_date)?,
            reservation_time: require("reservationTime", self.reservation_time)?,
        })
    }
}

/// Row action: offered for open reservations only.
pub fn can_cancel(reservation: &Reservation) -> bool {
    !reservation.status.is_terminal()
}

pub fn can_reschedule(reservation: &Reservation) -> bool {
    !reservation.status.is_terminal()
}

/// Locally held reservation list plus the operations that change it.
#[derive(Debug, Default)]
pub struct ReservationBook {
    reservations: Vec<Reservation>,
}

impl ReservationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn find(&self, id: i64) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    pub fn refresh(&mut self, api: &dyn HospitalApi) -> Result<&[Reservation], WorkflowError> {
        self.reservations = api.list_reservations()?;
        Ok(&self.reservations)
    }

    pub fn create_reservation(
        &mut self,
        api: &dyn HospitalApi,
        patient_id: i64,
        form: &ReservationForm,
    ) -> Result<Reservation, WorkflowError> {
        let request = form.validate(patient_id).inspect_err(|err| {
            tracing::warn!(error = %err, "Reservation form rejected");
        })?;
        let created = api.create_reservation(&request)?;
        tracing::info!(
            reservation_id = created.id,
            doctor_id = created.doctor_id,
            status = %created.status,
            "Reservation created"
        );
        self.refresh(api)?;
        Ok(created)
    }

    /// Partial update. A status change must be legal from the current status,
    /// and closed reservations cannot be moved.
    pub fn update_reservation(
        &mut self,
        api: &dyn HospitalApi,
        id: i64,
        update: &ReservationUpdate,
    ) -> Result<(), WorkflowError> {
        if update.is_empty() {
            return Err(ValidationError::invalid("update", "nothing to change").into());
        }
        let current = match self.find(id) {
            Some(r) => r.status,
            None => api.get_reservation(id)?.status,
        };
        check_update(current, update).inspect_err(|err| {
            tracing::warn!(reservation_id = id, error = %err, "Reservation update rejected");
        })?;

        api.update_reservation(id, update)?;
        tracing::info!(reservation_id = id, status = ?update.status, "Reservation updated");
        self.refresh(api)?;
        Ok(())
    }

    pub fn cancel_reservation(
        &mut self,
        api: &dyn HospitalApi,
        id: i64,
    ) -> Result<(), WorkflowError> {
        self.update_reservation(api, id, &ReservationUpdate::status(ReservationStatus::Cancelled))
    }

    pub fn confirm_reservation(
        &mut self,
        api: &dyn HospitalApi,
        id: i64,
    ) -> Result<(), WorkflowError> {
        self.update_reservation(api, id, &ReservationUpdate::status(ReservationStatus::Confirmed))
    }

    pub fn reschedule_reservation(
        &mut self,
        api: &dyn HospitalApi,
        id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<(), WorkflowError> {
        self.update_reservation(api, id, &ReservationUpdate::reschedule(date, time))
    }

    pub fn delete_reservation(
        &mut self,
        api: &dyn HospitalApi,
        id: i64,
    ) -> Result<(), WorkflowError> {
        api.delete_reservation(id)?;
        tracing::info!(reservation_id = id, "Reservation deleted");
        self.refresh(api)?;
        Ok(())
    }

    /// Search, filter and paginate the fetched list.
    pub fn query(&self, query: &ReservationQuery) -> Page<Reservation> {
        let mut rows: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.reservation_date, r.reservation_time, r.id));
        Page::slice(rows, query.page, query.page_size)
    }
}

fn check_update(
    current: ReservationStatus,
    update: &ReservationUpdate,
) -> Result<(), ValidationError> {
    if let Some(next) = update.status {
        if !current.can_transition_to(next) {
            return Err(ValidationError::transition(current, next));
        }
    }
    let moves_slot = update.reservation_date.is_some() || update.reservation_time.is_some();
    if moves_slot && current.is_terminal() {
        return Err(ValidationError::invalid(
            "reservationDate",
            format!("a {current} reservation cannot be rescheduled"),
        ));
    }
    Ok(())
}

/// Doctors bookable under a specialty, for the doctor dropdown.
pub fn doctors_by_specialty(
    api: &dyn HospitalApi,
    specialty_id: Option<i64>,
) -> Result<Vec<DoctorSummary>, WorkflowError> {
    let specialty_id = require_id("specialityId", specialty_id)?;
    Ok(api.doctors_by_specialty(specialty_id)?)
}

/// Table filters. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationQuery {
    pub search: String,
    pub status: Option<ReservationStatus>,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub page: usize,
    pub page_size: usize,
}

impl Default for ReservationQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: None,
            patient_id: None,
            doctor_id: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ReservationQuery {
    fn matches(&self, r: &Reservation) -> bool {
        if self.status.is_some_and(|s| s != r.status)
            || self.patient_id.is_some_and(|id| id != r.patient_id)
            || self.doctor_id.is_some_and(|id| id != r.doctor_id)
        {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            r.doctor_display_name(),
            r.patient_display_name(),
            r.speciality.clone(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cut page `page` out of `rows`; out-of-range pages are clamped.
    pub fn slice(rows: Vec<T>, page: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total_items = rows.len();
        let total_pages = total_items.div_ceil(page_size).max(1);
        let page = page.clamp(1, total_pages);
        let items = rows
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();
        Self {
            items,
            page,
            page_size,
            total_items,
            total_pages,
        }
    }
}
