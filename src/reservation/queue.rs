use chrono::NaiveDate;

use crate::api::HospitalApi;
use crate::error::WorkflowError;
use crate::models::{Reservation, ReservationStatus};

/// A doctor's patients for one day: still waiting, and already treated.
#[derive(Debug, Clone)]
pub struct TodayQueue {
    doctor_id: i64,
    day: NaiveDate,
    waiting: Vec<Reservation>,
    treated: Vec<Reservation>,
    /// Toggled after every successful treatment submission; views watch it
    /// to know when to redraw.
    refresh_queue: bool,
}

impl TodayQueue {
    pub fn new(doctor_id: i64, day: NaiveDate) -> Self {
        Self {
            doctor_id,
            day,
            waiting: Vec::new(),
            treated: Vec::new(),
            refresh_queue: false,
        }
    }

    pub fn doctor_id(&self) -> i64 {
        self.doctor_id
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn waiting(&self) -> &[Reservation] {
        &self.waiting
    }

    pub fn treated(&self) -> &[Reservation] {
        &self.treated
    }

    pub fn refresh_flag(&self) -> bool {
        self.refresh_queue
    }

    pub fn flip_refresh(&mut self) {
        self.refresh_queue = !self.refresh_queue;
    }

    pub fn reload(&mut self, api: &dyn HospitalApi) -> Result<(), WorkflowError> {
        let all = api.list_reservations()?;
        self.replace(all);
        tracing::debug!(
            doctor_id = self.doctor_id,
            waiting = self.waiting.len(),
            treated = self.treated.len(),
            "Queue reloaded"
        );
        Ok(())
    }

    fn replace(&mut self, all: Vec<Reservation>) {
        let (mut treated, mut waiting): (Vec<_>, Vec<_>) = all
            .into_iter()
            .filter(|r| r.doctor_id == self.doctor_id && r.reservation_date == self.day)
            .filter(|r| r.status != ReservationStatus::Cancelled)
            .partition(|r| r.status == ReservationStatus::Completed);
        waiting.sort_by_key(|r| (r.reservation_time, r.id));
        treated.sort_by_key(|r| (r.reservation_time, r.id));
        self.waiting = waiting;
        self.treated = treated;
    }

    /// Pick a waiting patient to open in the treatment panel.
    pub fn select(&self, reservation_id: i64) -> Option<&Reservation> {
        self.waiting.iter().find(|r| r.id == reservation_id)
    }

    /// First patient in line.
    pub fn next_patient(&self) -> Option<&Reservation> {
        self.waiting.first()
    }
}
