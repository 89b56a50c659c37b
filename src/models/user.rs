use serde::{Deserialize, Serialize};

use super::enums::Role;
use super::ids;

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    #[serde(deserialize_with = "ids::lenient")]
    pub id: i64,
    pub role: Role,
    pub token: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "ids::lenient")]
    pub id: i64,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Response of `GET /auth/public-key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    pub public_key: String,
}

/// Entry of `GET /auth/allspecialties`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialty {
    #[serde(deserialize_with = "ids::lenient")]
    pub id: i64,
    pub display_name: String,
}

/// Entry of `GET /reservations/getall/doctors/{specialtyId}`.
/// The backend keeps the Turkish column names for first/last name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorSummary {
    #[serde(deserialize_with = "ids::lenient")]
    pub id: i64,
    #[serde(rename = "ad")]
    pub name: String,
    #[serde(rename = "soyad")]
    pub surname: String,
    pub speciality: String,
}

impl DoctorSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}
