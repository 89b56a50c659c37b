//! Account payloads: patient self-registration and the admin dashboard's
//! staff management. Request bodies keep the backend's Turkish column
//! names; list rows arrive in either spelling.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::BloodGroup;
use super::ids;

/// Personal details every account form collects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    #[serde(rename = "ad")]
    pub name: String,
    #[serde(rename = "soyad")]
    pub surname: String,
    pub email: String,
    #[serde(rename = "telefon")]
    pub phone: String,
    #[serde(rename = "adres")]
    pub address: String,
    #[serde(rename = "birthDate")]
    pub birth_date: NaiveDate,
    #[serde(rename = "kanGrubu")]
    pub blood_group: BloodGroup,
    #[serde(rename = "tcKimlik")]
    pub national_id: String,
}

/// Body of `POST /auth/register`, and the common part of every staff
/// registration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(flatten)]
    pub details: PersonalDetails,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("details", &self.details)
            .finish()
    }
}

/// Body of a staff registration. Doctors carry a speciality and diploma
/// number, technicians a department and specialization; admins neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRegistration {
    #[serde(flatten)]
    pub account: RegisterRequest,
    #[serde(rename = "uzmanlik", default, skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
    #[serde(rename = "diplomaNo", default, skip_serializing_if = "Option::is_none")]
    pub diploma_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

/// An account as listed or fetched by id: staff tables and the patient profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    #[serde(deserialize_with = "ids::lenient")]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "ad")]
    pub name: String,
    #[serde(default, alias = "soyad")]
    pub surname: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "telefon")]
    pub phone: Option<String>,
    #[serde(default, alias = "adres")]
    pub address: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, alias = "kanGrubu")]
    pub blood_group: Option<String>,
    #[serde(default, alias = "tcKimlik")]
    pub national_id: Option<String>,
    #[serde(default, alias = "uzmanlik")]
    pub speciality: Option<String>,
    #[serde(default)]
    pub diploma_no: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
}

impl AccountRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }

    /// Case-insensitive match on name, surname or username.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || [&self.name, &self.surname, &self.username]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            || self.full_name().to_lowercase().contains(&needle)
    }
}

/// Body of a staff edit. Only the fields that are set are sent.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "ad", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "soyad", default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefon", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "adres", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "birthDate", default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "kanGrubu", default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodGroup>,
    #[serde(rename = "tcKimlik", default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(rename = "uzmanlik", default, skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
    #[serde(rename = "diplomaNo", default, skip_serializing_if = "Option::is_none")]
    pub diploma_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl std::fmt::Debug for AccountUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountUpdate")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name)
            .field("surname", &self.surname)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("birth_date", &self.birth_date)
            .finish_non_exhaustive()
    }
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to a stored record the way the server does. The password is
    /// not part of the record.
    pub fn apply_to(&self, record: &mut AccountRecord) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut record.username, &self.username);
        set(&mut record.name, &self.name);
        set(&mut record.surname, &self.surname);
        set_opt(&mut record.email, &self.email);
        set_opt(&mut record.phone, &self.phone);
        set_opt(&mut record.address, &self.address);
        set_opt(&mut record.birth_date, &self.birth_date);
        set_opt(&mut record.blood_group, &self.blood_group.map(|b| b.to_string()));
        set_opt(&mut record.national_id, &self.national_id);
        set_opt(&mut record.speciality, &self.speciality);
        set_opt(&mut record.diploma_no, &self.diploma_no);
        set_opt(&mut record.department, &self.department);
        set_opt(&mut record.specialization, &self.specialization);
    }
}
