use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{FastingStatus, ImagingType, LabPanel, Priority, RequestStatus};
use super::ids;

/// Laboratory test request, created by a doctor and completed by a technician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabRequest {
    #[serde(deserialize_with = "ids::lenient")]
    pub id: i64,
    #[serde(deserialize_with = "ids::lenient")]
    pub patient_id: i64,
    #[serde(deserialize_with = "ids::lenient")]
    pub doctor_id: i64,
    #[serde(default, deserialize_with = "ids::lenient_opt")]
    pub reservation_id: Option<i64>,
    pub test_panel: Vec<LabPanel>,
    pub priority: Priority,
    pub fasting_status: FastingStatus,
    #[serde(default)]
    pub notes: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Option<String>,
    #[serde(default, deserialize_with = "ids::lenient_opt")]
    pub technician_id: Option<i64>,
    #[serde(default)]
    pub test_pdfs: Vec<LabPdf>,
}

/// Imaging request (ECG, X-ray, MRI, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagingRequest {
    #[serde(deserialize_with = "ids::lenient")]
    pub id: i64,
    #[serde(deserialize_with = "ids::lenient")]
    pub patient_id: i64,
    #[serde(deserialize_with = "ids::lenient")]
    pub doctor_id: i64,
    #[serde(default, deserialize_with = "ids::lenient_opt")]
    pub reservation_id: Option<i64>,
    pub imaging_type: ImagingType,
    pub body_part: String,
    pub priority: Priority,
    #[serde(default)]
    pub notes: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub findings: Option<String>,
    #[serde(default, deserialize_with = "ids::lenient_opt")]
    pub technician_id: Option<i64>,
    /// Base64 image payload. Omitted from list responses by most backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

/// One PDF result attached to a lab request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabPdf {
    pub test_type: LabPanel,
    pub file_name: String,
    /// Base64, standard alphabet, no `data:` prefix.
    pub pdf_data: String,
}

/// Body of `POST /lab-requests/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLabRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub reservation_id: i64,
    pub test_panel: Vec<LabPanel>,
    pub priority: Priority,
    pub fasting_status: FastingStatus,
    pub notes: String,
}

/// Body of `POST /imaging-requests/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewImagingRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub reservation_id: i64,
    pub imaging_type: ImagingType,
    pub body_part: String,
    pub priority: Priority,
    pub notes: String,
}

/// Body of `PUT /technicians/lab-requests/{id}/complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabCompletion {
    pub results: String,
    pub notes: String,
    pub technician_id: i64,
    pub test_pdfs: Vec<LabPdf>,
    pub status: RequestStatus,
    pub completed_at: DateTime<Utc>,
}

/// Body of `PUT /technicians/imaging-requests/{id}/complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagingCompletion {
    pub image_data: String,
    pub findings: String,
    pub notes: String,
    pub technician_id: i64,
    pub status: RequestStatus,
    pub completed_at: DateTime<Utc>,
}
