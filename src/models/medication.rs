use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::enums::{CourseUnit, MedicationRoute};
use super::ids;
use super::validation::ValidationError;

/// A prescription written from the medications tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    #[serde(
        default,
        deserialize_with = "ids::lenient_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    #[serde(deserialize_with = "ids::lenient")]
    pub doctor_id: i64,
    #[serde(deserialize_with = "ids::lenient")]
    pub patient_id: i64,
    #[serde(deserialize_with = "ids::lenient")]
    pub reservation_id: i64,
    pub medications: Vec<MedicationLine>,
    #[serde(default)]
    pub notes: String,
}

/// One drug on a prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLine {
    #[serde(default, deserialize_with = "ids::lenient_opt")]
    pub medicine_id: Option<i64>,
    pub name: String,
    pub dosage: String,
    pub usage: MedicationRoute,
    /// Daily schedule as written by the doctor, e.g. `2x1`.
    pub frequency: String,
    /// Course length as written by the doctor, e.g. `10 DAY`.
    pub duration: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl MedicationLine {
    /// Build a line from a course length; the end date is the last day of the course.
    /// A course that would end past the calendar's range is rejected on `duration`.
    #[allow(clippy::too_many_arguments)]
    pub fn for_course(
        medicine_id: Option<i64>,
        name: &str,
        dosage: &str,
        usage: MedicationRoute,
        frequency: &str,
        start_date: NaiveDate,
        length: u32,
        unit: CourseUnit,
    ) -> Result<Self, ValidationError> {
        let length = length.max(1);
        let days = i64::from(length) * unit.days();
        let end_date = Duration::try_days(days - 1)
            .and_then(|span| start_date.checked_add_signed(span))
            .ok_or_else(|| {
                ValidationError::invalid("duration", format!("{length} {unit} is too long"))
            })?;
        Ok(Self {
            medicine_id,
            name: name.to_string(),
            dosage: dosage.to_string(),
            usage,
            frequency: frequency.to_string(),
            duration: format!("{length} {unit}"),
            start_date,
            end_date,
        })
    }
}

/// Catalog entry from `/medicine/*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    #[serde(deserialize_with = "ids::lenient")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub form: Option<String>,
}
