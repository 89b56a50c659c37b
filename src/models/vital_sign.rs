use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::reservation::ClinicalContext;
use super::validation::ValidationError;

/// Vitals captured on the first tab of the treatment panel, persisted as
/// their own medical record (`POST /medical-record/create/appointment`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsRecord {
    pub reservation_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub blood_pressure: Option<String>,
    pub pulse: Option<u16>,
    pub temperature: Option<f32>,
    pub respiration: Option<u16>,
    pub spo2: Option<u8>,
    pub height_cm: Option<f32>,
    pub weight_kg: Option<f32>,
    pub bmi: Option<f32>,
}

/// Raw inputs of the vitals tab. Everything is optional; what is filled in
/// must be physiologically plausible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VitalsDraft {
    pub blood_pressure: Option<String>,
    pub pulse: Option<u16>,
    pub temperature: Option<f32>,
    pub respiration: Option<u16>,
    pub spo2: Option<u8>,
    pub height_cm: Option<f32>,
    pub weight_kg: Option<f32>,
}

fn blood_pressure_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{2,3})\s*/\s*(\d{2,3})$").expect("static BP pattern")
    })
}

fn check_range<T: PartialOrd + Copy + std::fmt::Display>(
    field: &str,
    value: Option<T>,
    low: T,
    high: T,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v < low || v > high => Err(ValidationError::invalid(
            field,
            format!("{v} is outside {low}..{high}"),
        )),
        _ => Ok(()),
    }
}

/// Like [`check_range`], but NaN and infinities are rejected outright.
fn check_measure(
    field: &str,
    value: Option<f32>,
    low: f32,
    high: f32,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ValidationError::invalid(field, "must be a number")),
        _ => check_range(field, value, low, high),
    }
}

/// Body-mass index rounded to one decimal, when both inputs are present.
pub fn body_mass_index(height_cm: Option<f32>, weight_kg: Option<f32>) -> Option<f32> {
    let height_m = height_cm? / 100.0;
    let weight = weight_kg?;
    if height_m <= 0.0 {
        return None;
    }
    Some((weight / (height_m * height_m) * 10.0).round() / 10.0)
}

impl VitalsDraft {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validate and attach the visit context.
    pub fn into_record(self, ctx: ClinicalContext) -> Result<VitalsRecord, ValidationError> {
        let blood_pressure = match self.blood_pressure.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let caps = blood_pressure_pattern().captures(raw).ok_or_else(|| {
                    ValidationError::invalid(
                        "bloodPressure",
                        "expected systolic/diastolic, e.g. 120/80",
                    )
                })?;
                let systolic: u16 = caps[1]
                    .parse()
                    .map_err(|_| ValidationError::invalid("bloodPressure", "bad systolic"))?;
                let diastolic: u16 = caps[2]
                    .parse()
                    .map_err(|_| ValidationError::invalid("bloodPressure", "bad diastolic"))?;
                if diastolic >= systolic {
                    return Err(ValidationError::invalid(
                        "bloodPressure",
                        "diastolic must be lower than systolic",
                    ));
                }
                Some(format!("{systolic}/{diastolic}"))
            }
        };

        check_range("pulse", self.pulse, 20, 250)?;
        check_measure("temperature", self.temperature, 30.0, 45.0)?;
        check_range("respiration", self.respiration, 4, 80)?;
        check_range("spo2", self.spo2, 50, 100)?;
        check_measure("heightCm", self.height_cm, 30.0, 250.0)?;
        check_measure("weightKg", self.weight_kg, 1.0, 400.0)?;

        Ok(VitalsRecord {
            reservation_id: ctx.reservation_id,
            patient_id: ctx.patient_id,
            doctor_id: ctx.doctor_id,
            blood_pressure,
            pulse: self.pulse,
            temperature: self.temperature,
            respiration: self.respiration,
            spo2: self.spo2,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            bmi: body_mass_index(self.height_cm, self.weight_kg),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ClinicalContext {
        ClinicalContext { reservation_id: 1, patient_id: 2, doctor_id: 3 }
    }

    #[test]
    fn bmi_from_height_and_weight() {
        assert_eq!(body_mass_index(Some(180.0), Some(81.0)), Some(25.0));
        assert_eq!(body_mass_index(None, Some(81.0)), None);
        assert_eq!(body_mass_index(Some(0.0), Some(81.0)), None);
    }

    #[test]
    fn record_normalizes_blood_pressure() {
        let draft = VitalsDraft {
            blood_pressure: Some(" 120 / 80 ".into()),
            pulse: Some(72),
            height_cm: Some(170.0),
            weight_kg: Some(70.0),
            ..Default::default()
        };
        let record = draft.into_record(ctx()).unwrap();
        assert_eq!(record.blood_pressure.as_deref(), Some("120/80"));
        assert_eq!(record.bmi, Some(24.2));
        assert_eq!(record.reservation_id, 1);
    }

    #[test]
    fn rejects_inverted_blood_pressure() {
        let draft = VitalsDraft {
            blood_pressure: Some("80/120".into()),
            ..Default::default()
        };
        let err = draft.into_record(ctx()).unwrap_err();
        assert_eq!(err.field(), Some("bloodPressure"));
    }

    #[test]
    fn rejects_implausible_pulse() {
        let draft = VitalsDraft { pulse: Some(400), ..Default::default() };
        assert_eq!(draft.into_record(ctx()).unwrap_err().field(), Some("pulse"));
    }

    #[test]
    fn rejects_non_finite_measurements() {
        let draft = VitalsDraft { temperature: Some(f32::NAN), ..Default::default() };
        assert_eq!(draft.into_record(ctx()).unwrap_err().field(), Some("temperature"));

        let draft = VitalsDraft { weight_kg: Some(f32::INFINITY), ..Default::default() };
        assert_eq!(draft.into_record(ctx()).unwrap_err().field(), Some("weightKg"));

        let draft = VitalsDraft { height_cm: Some(f32::NEG_INFINITY), ..Default::default() };
        assert_eq!(draft.into_record(ctx()).unwrap_err().field(), Some("heightCm"));
    }

    #[test]
    fn empty_draft_is_empty() {
        assert!(VitalsDraft::default().is_empty());
        assert!(!VitalsDraft { spo2: Some(98), ..Default::default() }.is_empty());
    }
}
