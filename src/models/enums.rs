use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::validation::ValidationError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Wire form is the string literal, both for serde and for query strings.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ValidationError::InvalidValue {
                        field: stringify!($name).into(),
                        reason: format!("unknown value '{s}'"),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(
    /// Lifecycle of an appointment. Completed and Cancelled are terminal.
    ReservationStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
);

str_enum!(
    /// Lifecycle of a lab or imaging request.
    RequestStatus {
        Pending => "PENDING",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
);

str_enum!(Priority {
    Normal => "NORMAL",
    Urgent => "URGENT",
});

str_enum!(FastingStatus {
    Fasting => "FASTING",
    Fed => "FED",
    NotRequired => "NOT_REQUIRED",
});

str_enum!(ImagingType {
    Ecg => "ECG",
    XRay => "XRAY",
    Mri => "MRI",
    Ct => "CT",
    Ultrasound => "ULTRASOUND",
});

str_enum!(LabPanel {
    CompleteBloodCount => "COMPLETE_BLOOD_COUNT",
    Biochemistry => "BIOCHEMISTRY",
    Hormone => "HORMONE",
    Urinalysis => "URINALYSIS",
    Coagulation => "COAGULATION",
    Sedimentation => "SEDIMENTATION",
    Crp => "CRP",
});

str_enum!(TreatmentType {
    Outpatient => "OUTPATIENT",
    Inpatient => "INPATIENT",
});

str_enum!(MedicationRoute {
    Oral => "ORAL",
    Intramuscular => "IM",
    Intravenous => "IV",
    Subcutaneous => "SC",
});

str_enum!(Role {
    Admin => "ADMIN",
    Doctor => "DOCTOR",
    Patient => "PATIENT",
    Secretary => "SECRETARY",
    Technician => "TECHNICIAN",
});

str_enum!(BloodGroup {
    APositive => "A+",
    ANegative => "A-",
    BPositive => "B+",
    BNegative => "B-",
    AbPositive => "AB+",
    AbNegative => "AB-",
    ZeroPositive => "0+",
    ZeroNegative => "0-",
});

str_enum!(
    /// Account families the admin dashboard manages.
    StaffKind {
        Admin => "ADMIN",
        Doctor => "DOCTOR",
        Technician => "TECHNICIAN",
    }
);

str_enum!(
    /// Derived client-side from medication end dates, never persisted.
    PrescriptionStatus {
        Active => "ACTIVE",
        Completed => "COMPLETED",
        Expired => "EXPIRED",
    }
);

str_enum!(
    /// Unit of a medication course length.
    CourseUnit {
        Day => "DAY",
        Week => "WEEK",
        Month => "MONTH",
    }
);

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            Self::Completed | Self::Cancelled => true,
            Self::Pending | Self::Confirmed => false,
        }
    }

    /// Legal moves: Pending → Confirmed | Completed | Cancelled,
    /// Confirmed → Completed | Cancelled. Staying put is always allowed.
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        match self {
            Self::Pending => true,
            Self::Confirmed => matches!(next, Self::Confirmed | Self::Completed | Self::Cancelled),
            Self::Completed | Self::Cancelled => self == next,
        }
    }
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            Self::Pending => false,
            Self::Completed | Self::Cancelled => true,
        }
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        match self {
            Self::Pending => next.is_terminal(),
            Self::Completed | Self::Cancelled => false,
        }
    }
}

impl StaffKind {
    pub fn role(self) -> Role {
        match self {
            Self::Admin => Role::Admin,
            Self::Doctor => Role::Doctor,
            Self::Technician => Role::Technician,
        }
    }
}

impl CourseUnit {
    pub fn days(self) -> i64 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
        }
    }
}

impl LabPanel {
    /// Human-readable panel name for worklists and PDF labels.
    pub fn label(self) -> &'static str {
        match self {
            Self::CompleteBloodCount => "Complete blood count",
            Self::Biochemistry => "Biochemistry",
            Self::Hormone => "Hormone tests",
            Self::Urinalysis => "Urinalysis",
            Self::Coagulation => "Coagulation",
            Self::Sedimentation => "Sedimentation",
            Self::Crp => "CRP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn reservation_status_wire_form() {
        for (variant, s) in [
            (ReservationStatus::Pending, "PENDING"),
            (ReservationStatus::Confirmed, "CONFIRMED"),
            (ReservationStatus::Completed, "COMPLETED"),
            (ReservationStatus::Cancelled, "CANCELLED"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ReservationStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("pending".parse::<RequestStatus>().unwrap(), RequestStatus::Pending);
        assert_eq!(" urgent ".parse::<Priority>().unwrap(), Priority::Urgent);
    }

    #[test]
    fn unknown_value_is_validation_error() {
        let err = "IN_PROGRESS".parse::<RequestStatus>().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidValue { ref field, .. } if field == "RequestStatus"
        ));
    }

    #[test]
    fn blood_group_keeps_symbols() {
        assert_eq!(BloodGroup::AbNegative.as_str(), "AB-");
        assert_eq!("ab+".parse::<BloodGroup>().unwrap(), BloodGroup::AbPositive);
        assert_eq!(serde_json::to_string(&BloodGroup::ZeroPositive).unwrap(), "\"0+\"");
        assert!("O+".parse::<BloodGroup>().is_err());
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&ReservationStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
        let parsed: MedicationRoute = serde_json::from_str("\"IM\"").unwrap();
        assert_eq!(parsed, MedicationRoute::Intramuscular);
        assert!(serde_json::from_str::<Role>("\"JANITOR\"").is_err());
    }

    #[test]
    fn cancelled_reservation_never_reopens() {
        for next in ReservationStatus::ALL {
            if *next != ReservationStatus::Cancelled {
                assert!(!ReservationStatus::Cancelled.can_transition_to(*next));
            }
        }
        assert!(!ReservationStatus::Cancelled.can_transition_to(ReservationStatus::Confirmed));
    }

    #[test]
    fn open_reservations_can_finish_or_cancel() {
        for from in [ReservationStatus::Pending, ReservationStatus::Confirmed] {
            assert!(from.can_transition_to(ReservationStatus::Completed));
            assert!(from.can_transition_to(ReservationStatus::Cancelled));
        }
        assert!(ReservationStatus::Pending.can_transition_to(ReservationStatus::Confirmed));
        assert!(!ReservationStatus::Confirmed.can_transition_to(ReservationStatus::Pending));
        assert!(!ReservationStatus::Completed.can_transition_to(ReservationStatus::Cancelled));
    }

    #[test]
    fn request_status_only_leaves_pending() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Completed));
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Cancelled));
        assert!(!RequestStatus::Completed.can_transition_to(RequestStatus::Pending));
        assert!(!RequestStatus::Cancelled.can_transition_to(RequestStatus::Completed));
        assert!(!RequestStatus::Completed.can_transition_to(RequestStatus::Completed));
    }
}
