use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ApiError, HospitalApi, TokenSource};
use crate::config::ClientConfig;
use crate::models::{
    AccountRecord, AccountUpdate, DiagnosisSubmission, DoctorSummary, ImagingCompletion,
    ImagingRequest, LabCompletion, LabRequest, LoginRequest, LoginResponse, Medicine,
    NewImagingRequest, NewLabRequest, NewReservation, Prescription, PublicKey, RegisterRequest,
    RequestStatus, Reservation, ReservationUpdate, Specialty, StaffKind, StaffRegistration,
    UserProfile, VitalsRecord,
};

/// Blocking HTTP client for the hospital backend.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    tokens: Arc<dyn TokenSource>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: config.timeout_secs,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.tokens.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and turn non-2xx answers into classified errors.
    fn execute(&self, builder: RequestBuilder, label: &str) -> Result<Response, ApiError> {
        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                ApiError::Network(self.base_url.clone())
            } else {
                ApiError::from(e)
            }
        });
        let response = match response {
            Ok(r) => r,
            Err(err) => {
                tracing::error!(call = label, error = %err, "Backend unreachable");
                return Err(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let err = ApiError::from_response(status.as_u16(), &body);
            tracing::error!(
                call = label,
                status = status.as_u16(),
                error = %err,
                "Backend call failed"
            );
            return Err(err);
        }
        tracing::debug!(call = label, status = status.as_u16(), "Backend call succeeded");
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        status: Option<RequestStatus>,
    ) -> Result<T, ApiError> {
        let mut builder = self.request(Method::GET, path);
        if let Some(status) = status {
            builder = builder.query(&[("status", status.as_str())]);
        }
        let response = self.execute(builder, path)?;
        response.json().map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.execute(self.request(method, path).json(body), path)?;
        response.json().map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// For endpoints whose success body is plain text or empty.
    fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = self.execute(builder, path)?;
        let text = response.text().unwrap_or_default();
        if !text.is_empty() {
            tracing::debug!(call = path, reply = %text, "Backend acknowledged");
        }
        Ok(())
    }
}

impl HospitalApi for HttpBackend {
    fn public_key(&self) -> Result<PublicKey, ApiError> {
        self.get_json("/auth/public-key", None)
    }

    fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.send_json(Method::POST, "/auth/login", request)
    }

    fn me(&self) -> Result<UserProfile, ApiError> {
        self.get_json("/auth/me", None)
    }

    fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        self.send_unit(Method::POST, "/auth/register", Some(request))
    }

    fn specialties(&self) -> Result<Vec<Specialty>, ApiError> {
        self.get_json("/auth/allspecialties", None)
    }

    fn create_staff(
        &self,
        kind: StaffKind,
        registration: &StaffRegistration,
    ) -> Result<(), ApiError> {
        self.send_unit(Method::POST, kind.create_path(), Some(registration))
    }

    fn list_staff(&self, kind: StaffKind) -> Result<Vec<AccountRecord>, ApiError> {
        self.get_json(kind.list_path(), None)
    }

    fn get_staff(&self, kind: StaffKind, id: i64) -> Result<AccountRecord, ApiError> {
        self.get_json(&kind.item_path("get", id), None)
    }

    fn update_staff(
        &self,
        kind: StaffKind,
        id: i64,
        update: &AccountUpdate,
    ) -> Result<(), ApiError> {
        self.send_unit(Method::PUT, &kind.item_path("update", id), Some(update))
    }

    fn delete_staff(&self, kind: StaffKind, id: i64) -> Result<(), ApiError> {
        self.send_unit::<()>(Method::DELETE, &kind.item_path("delete", id), None)
    }

    fn patient_profile(&self, patient_id: i64) -> Result<AccountRecord, ApiError> {
        self.get_json(&format!("/patient/get/{patient_id}"), None)
    }

    fn doctors_by_specialty(&self, specialty_id: i64) -> Result<Vec<DoctorSummary>, ApiError> {
        self.get_json(&format!("/reservations/getall/doctors/{specialty_id}"), None)
    }

    fn create_reservation(&self, reservation: &NewReservation) -> Result<Reservation, ApiError> {
        self.send_json(Method::POST, "/reservations/create", reservation)
    }

    fn get_reservation(&self, id: i64) -> Result<Reservation, ApiError> {
        self.get_json(&format!("/reservations/get/{id}"), None)
    }

    fn list_reservations(&self) -> Result<Vec<Reservation>, ApiError> {
        self.get_json("/reservations/getall", None)
    }

    fn update_reservation(&self, id: i64, update: &ReservationUpdate) -> Result<(), ApiError> {
        self.send_unit(Method::PUT, &format!("/reservations/update/{id}"), Some(update))
    }

    fn delete_reservation(&self, id: i64) -> Result<(), ApiError> {
        self.send_unit::<()>(Method::DELETE, &format!("/reservations/delete/{id}"), None)
    }

    fn create_diagnosis(&self, submission: &DiagnosisSubmission) -> Result<(), ApiError> {
        self.send_unit(Method::POST, "/doctor/diagnoses/create", Some(submission))
    }

    fn create_vitals(&self, record: &VitalsRecord) -> Result<(), ApiError> {
        self.send_unit(Method::POST, "/medical-record/create/appointment", Some(record))
    }

    fn create_prescription(&self, prescription: &Prescription) -> Result<Prescription, ApiError> {
        self.send_json(Method::POST, "/prescriptions/create", prescription)
    }

    fn prescriptions_for_patient(&self, patient_id: i64) -> Result<Vec<Prescription>, ApiError> {
        self.get_json(&format!("/prescriptions/patient/{patient_id}"), None)
    }

    fn medicines_for_doctor(&self) -> Result<Vec<Medicine>, ApiError> {
        self.get_json("/medicine/getAllByDoctorSpeciality", None)
    }

    fn create_lab_request(&self, request: &NewLabRequest) -> Result<LabRequest, ApiError> {
        self.send_json(Method::POST, "/lab-requests/create", request)
    }

    fn lab_requests_for_patient(
        &self,
        patient_id: i64,
        status: Option<RequestStatus>,
    ) -> Result<Vec<LabRequest>, ApiError> {
        self.get_json(&format!("/lab-requests/patient/{patient_id}/all"), status)
    }

    fn lab_worklist(&self, status: Option<RequestStatus>) -> Result<Vec<LabRequest>, ApiError> {
        self.get_json("/technicians/lab-requests/all", status)
    }

    fn complete_lab_request(&self, id: i64, completion: &LabCompletion) -> Result<(), ApiError> {
        self.send_unit(
            Method::PUT,
            &format!("/technicians/lab-requests/{id}/complete"),
            Some(completion),
        )
    }

    fn create_imaging_request(
        &self,
        request: &NewImagingRequest,
    ) -> Result<ImagingRequest, ApiError> {
        self.send_json(Method::POST, "/imaging-requests/create", request)
    }

    fn imaging_requests_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<ImagingRequest>, ApiError> {
        self.get_json(&format!("/imaging-requests/patient/{patient_id}"), None)
    }

    fn imaging_worklist(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ImagingRequest>, ApiError> {
        self.get_json("/technicians/imaging-requests/all", status)
    }

    fn complete_imaging_request(
        &self,
        id: i64,
        completion: &ImagingCompletion,
    ) -> Result<(), ApiError> {
        self.send_unit(
            Method::PUT,
            &format!("/technicians/imaging-requests/{id}/complete"),
            Some(completion),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StaticToken;
    use crate::models::{ReservationStatus, Role};
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, get, post, put};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    /// Serve `router` on an ephemeral port from a background thread.
    fn spawn_stub(router: Router) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, router).await.unwrap();
            });
        });
        format!("http://{addr}/api")
    }

    fn backend(base_url: &str, token: Option<&str>) -> HttpBackend {
        let config = ClientConfig::new(base_url);
        HttpBackend::new(&config, Arc::new(StaticToken(token.map(String::from)))).unwrap()
    }

    fn reservation_json(id: i64, status: &str) -> Value {
        json!({
            "id": id,
            "doctorId": "12",
            "patientId": "40",
            "speciality": "CARDIOLOGY",
            "reservationDate": "2025-01-15",
            "reservationTime": "10:30:00",
            "status": status
        })
    }

    #[test]
    fn login_posts_credentials() {
        let router = Router::new().route(
            "/api/auth/login",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["username"], "dr.demir");
                Json(json!({
                    "username": "dr.demir", "id": 5, "role": "DOCTOR",
                    "token": "jwt-token", "message": "ok"
                }))
            }),
        );
        let api = backend(&spawn_stub(router), None);
        let resp = api
            .login(&LoginRequest { username: "dr.demir".into(), password: "pw".into() })
            .unwrap();
        assert_eq!(resp.role, Role::Doctor);
        assert_eq!(resp.token, "jwt-token");
    }

    #[test]
    fn bearer_token_is_attached() {
        let router = Router::new().route(
            "/api/reservations/getall",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer secret" {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(json!([reservation_json(1, "PENDING")])))
            }),
        );
        let base = spawn_stub(router);

        let list = backend(&base, Some("secret")).list_reservations().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].status, ReservationStatus::Pending);

        let err = backend(&base, None).list_reservations().unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
    }

    #[test]
    fn update_accepts_plain_text_reply() {
        let router = Router::new().route(
            "/api/reservations/update/:id",
            put(|Path(id): Path<i64>, Json(body): Json<Value>| async move {
                assert_eq!(id, 3);
                assert_eq!(body, json!({ "status": "CANCELLED" }));
                "Reservation updated"
            }),
        );
        let api = backend(&spawn_stub(router), Some("t"));
        api.update_reservation(3, &ReservationUpdate::status(ReservationStatus::Cancelled))
            .unwrap();
    }

    #[test]
    fn worklist_sends_status_filter() {
        let router = Router::new().route(
            "/api/technicians/lab-requests/all",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("status").map(String::as_str), Some("PENDING"));
                Json(json!([{
                    "id": 8, "patientId": 40, "doctorId": 12,
                    "testPanel": ["CRP"], "priority": "NORMAL",
                    "fastingStatus": "NOT_REQUIRED", "status": "PENDING",
                    "createdAt": "2025-01-10T08:00:00Z"
                }]))
            }),
        );
        let api = backend(&spawn_stub(router), Some("t"));
        let list = api.lab_worklist(Some(RequestStatus::Pending)).unwrap();
        assert_eq!(list[0].id, 8);
    }

    #[test]
    fn backend_message_is_surfaced() {
        let router = Router::new().route(
            "/api/reservations/get/:id",
            get(|Path(_id): Path<i64>| async move {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({
                        "status": "NOT_FOUND",
                        "message": "Reservation not found",
                        "timestamp": "2025-01-10T10:00:00"
                    })),
                )
            }),
        );
        let api = backend(&spawn_stub(router), Some("t"));
        let err = api.get_reservation(99).unwrap_err();
        assert_eq!(err, ApiError::NotFound("Reservation not found".into()));
    }

    #[test]
    fn register_posts_turkish_field_names() {
        let router = Router::new().route(
            "/api/auth/register",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["username"], "12345678901");
                assert_eq!(body["soyad"], "Yilmaz");
                assert_eq!(body["kanGrubu"], "0-");
                "Registered"
            }),
        );
        let api = backend(&spawn_stub(router), None);
        let request = RegisterRequest {
            username: "12345678901".into(),
            password: "secret1".into(),
            details: crate::models::PersonalDetails {
                name: "Ahmet".into(),
                surname: "Yilmaz".into(),
                email: "ahmet@example.com".into(),
                phone: "05321234567".into(),
                address: "Izmir".into(),
                birth_date: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                blood_group: crate::models::BloodGroup::ZeroNegative,
                national_id: "12345678901".into(),
            },
        };
        api.register(&request).unwrap();
    }

    #[test]
    fn staff_calls_reach_each_collection() {
        let router = Router::new()
            .route(
                "/api/admin/doctor/all",
                get(|| async {
                    Json(json!([{ "id": 9, "name": "Ayse", "speciality": "CARDIOLOGY" }]))
                }),
            )
            .route(
                "/api/technicians/:id",
                put(|Path(id): Path<i64>, Json(body): Json<Value>| async move {
                    assert_eq!(id, 4);
                    assert_eq!(body, json!({ "department": "RADIOLOGY" }));
                    "updated"
                })
                .delete(|Path(id): Path<i64>| async move {
                    assert_eq!(id, 4);
                    StatusCode::NO_CONTENT
                }),
            )
            .route(
                "/api/admin/delete/:id",
                delete(|Path(_id): Path<i64>| async { StatusCode::FORBIDDEN }),
            )
            .route(
                "/api/patient/get/:id",
                get(|Path(id): Path<i64>| async move {
                    Json(json!({
                        "id": id, "ad": "Ali", "soyad": "Can", "tcKimlik": "12345678901"
                    }))
                }),
            );
        let api = backend(&spawn_stub(router), Some("admin-token"));

        let doctors = api.list_staff(StaffKind::Doctor).unwrap();
        assert_eq!(doctors[0].speciality.as_deref(), Some("CARDIOLOGY"));

        let update = AccountUpdate { department: Some("RADIOLOGY".into()), ..Default::default() };
        api.update_staff(StaffKind::Technician, 4, &update).unwrap();
        api.delete_staff(StaffKind::Technician, 4).unwrap();

        let err = api.delete_staff(StaffKind::Admin, 1).unwrap_err();
        assert!(err.is_authorization(), "got {err:?}");

        let patient = api.patient_profile(40).unwrap();
        assert_eq!(patient.full_name(), "Ali Can");
        assert_eq!(patient.national_id.as_deref(), Some("12345678901"));
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let router = Router::new().route(
            "/api/auth/allspecialties",
            get(|| async { Json(json!({ "unexpected": true })) }),
        );
        let api = backend(&spawn_stub(router), None);
        assert!(matches!(api.specialties(), Err(ApiError::Decode(_))));
    }

    #[test]
    fn unreachable_backend_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let api = backend(&format!("http://127.0.0.1:{port}/api"), None);
        let err = api.specialties().unwrap_err();
        assert!(err.is_network(), "got {err:?}");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = backend("http://localhost:8080/api/", None);
        assert_eq!(api.base_url(), "http://localhost:8080/api");
    }
}
