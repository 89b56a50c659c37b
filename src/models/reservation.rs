use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::ReservationStatus;
use super::ids;

/// An appointment as returned by `/reservations/*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(deserialize_with = "ids::lenient")]
    pub id: i64,
    #[serde(deserialize_with = "ids::lenient")]
    pub patient_id: i64,
    #[serde(deserialize_with = "ids::lenient")]
    pub doctor_id: i64,
    pub speciality: String,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_surname: Option<String>,
}

impl Reservation {
    pub fn doctor_display_name(&self) -> String {
        join_name(self.doctor_name.as_deref(), self.doctor_surname.as_deref())
    }

    pub fn patient_display_name(&self) -> String {
        join_name(self.patient_name.as_deref(), self.patient_surname.as_deref())
    }

    /// Clinical context of the visit this reservation represents.
    pub fn context(&self) -> ClinicalContext {
        ClinicalContext {
            reservation_id: self.id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
        }
    }
}

fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Body of `POST /reservations/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub speciality: String,
    pub doctor_id: i64,
    pub patient_id: i64,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
}

/// Body of `PUT /reservations/update/{id}`. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
}

impl ReservationUpdate {
    pub fn status(status: ReservationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn reschedule(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            reservation_date: Some(date),
            reservation_time: Some(time),
            status: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reservation_date.is_none() && self.reservation_time.is_none() && self.status.is_none()
    }

    /// Apply to a reservation the way the server does: last write wins.
    pub fn apply_to(&self, reservation: &mut Reservation) {
        if let Some(date) = self.reservation_date {
            reservation.reservation_date = date;
        }
        if let Some(time) = self.reservation_time {
            reservation.reservation_time = time;
        }
        if let Some(status) = self.status {
            reservation.status = status;
        }
    }
}

/// The reservation/patient/doctor triple every clinical record hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalContext {
    pub reservation_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "id": 3,
            "doctorId": "12",
            "doctorName": "Ayse",
            "doctorSurname": "Demir",
            "patientId": "40",
            "patientName": "Ahmet",
            "patientSurname": "Yilmaz",
            "reservationDate": "2025-01-15",
            "reservationTime": "10:30:00",
            "status": "CONFIRMED",
            "speciality": "CARDIOLOGY"
        }"#
    }

    #[test]
    fn parses_backend_response() {
        let r: Reservation = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(r.id, 3);
        assert_eq!(r.doctor_id, 12);
        assert_eq!(r.patient_id, 40);
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.doctor_display_name(), "Ayse Demir");
        assert_eq!(r.patient_display_name(), "Ahmet Yilmaz");
        assert_eq!(
            r.context(),
            ClinicalContext { reservation_id: 3, patient_id: 40, doctor_id: 12 }
        );
    }

    #[test]
    fn display_name_skips_missing_parts() {
        let mut r: Reservation = serde_json::from_str(sample_json()).unwrap();
        r.doctor_name = None;
        assert_eq!(r.doctor_display_name(), "Demir");
    }

    #[test]
    fn status_update_serializes_only_status() {
        let update = ReservationUpdate::status(ReservationStatus::Cancelled);
        let body = serde_json::to_value(update).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "CANCELLED" }));
    }

    #[test]
    fn apply_update_keeps_unset_fields() {
        let mut r: Reservation = serde_json::from_str(sample_json()).unwrap();
        let new_date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        ReservationUpdate {
            reservation_date: Some(new_date),
            ..Default::default()
        }
        .apply_to(&mut r);
        assert_eq!(r.reservation_date, new_date);
        assert_eq!(r.reservation_time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(r.status, ReservationStatus::Confirmed);
    }
}
