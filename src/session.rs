//! Signed-in user state and bearer token persistence.
//!
//! State changes go through [`AuthAction`] and the pure [`AuthState::reduce`].
//! [`AuthSession`] wraps the state for sharing across threads and mirrors
//! the token into encrypted local storage, so a restart can pick the
//! session back up with `restore`. Patients create their own account with
//! [`register`]; the same [`AccountForm`] backs the admin's staff forms.

use std::sync::{Mutex, PoisonError, RwLock};

use chrono::NaiveDate;

use crate::api::{HospitalApi, TokenSource};
use crate::config::{self, ClientConfig};
use crate::error::WorkflowError;
use crate::models::validation::{
    require, require_email, require_national_id, require_phone, require_text,
};
use crate::models::{
    BloodGroup, LoginRequest, PersonalDetails, RegisterRequest, Role, ValidationError,
};
use crate::storage::{EncryptedStore, TOKEN_KEY};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Inputs of the sign-up form and of the admin's staff forms.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccountForm {
    pub username: String,
    pub password: String,
    /// Staff forms ask for the password twice; sign-up does not.
    pub confirm_password: Option<String>,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub birth_date: Option<NaiveDate>,
    pub blood_group: Option<BloodGroup>,
    pub national_id: String,
}

impl std::fmt::Debug for AccountForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountForm")
            .field("username", &self.username)
            .field("name", &self.name)
            .field("surname", &self.surname)
            .finish_non_exhaustive()
    }
}

impl AccountForm {
    /// Whitespace is stripped from the username, which is usually the
    /// national id typed with spaces.
    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        let username: String = self.username.split_whitespace().collect();
        if username.is_empty() {
            return Err(ValidationError::missing("username"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::missing("password"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::invalid(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        if let Some(confirm) = &self.confirm_password {
            if *confirm != self.password {
                return Err(ValidationError::invalid("confirmPassword", "passwords do not match"));
            }
        }

        Ok(RegisterRequest {
            username,
            password: self.password.clone(),
            details: PersonalDetails {
                name: require_text("name", &self.name)?,
                surname: require_text("surname", &self.surname)?,
                email: require_email("email", &self.email)?,
                phone: require_phone("phone", &self.phone)?,
                address: require_text("address", &self.address)?,
                birth_date: require("birthDate", self.birth_date)?,
                blood_group: require("bloodGroup", self.blood_group)?,
                national_id: require_national_id("nationalId", &self.national_id)?,
            },
        })
    }
}

/// Patient self-registration. The new account still has to sign in.
pub fn register(api: &dyn HospitalApi, form: &AccountForm) -> Result<(), WorkflowError> {
    let request = form.validate().inspect_err(|err| {
        tracing::warn!(error = %err, "Registration form rejected");
    })?;
    api.register(&request)?;
    tracing::info!(username = %request.username, "Patient registered");
    Ok(())
}

/// Who is signed in. The token is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub token: String,
}

impl std::fmt::Debug for UserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSession")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Anonymous,
    LoggingIn,
    SignedIn(UserSession),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    LoginStart,
    LoginSuccess(UserSession),
    LoginFailure(String),
    Logout,
}

impl AuthState {
    pub fn reduce(self, action: AuthAction) -> AuthState {
        match action {
            AuthAction::LoginStart => AuthState::LoggingIn,
            AuthAction::LoginSuccess(session) => AuthState::SignedIn(session),
            AuthAction::LoginFailure(message) => AuthState::Failed(message),
            AuthAction::Logout => AuthState::Anonymous,
        }
    }

    pub fn session(&self) -> Option<&UserSession> {
        match self {
            AuthState::SignedIn(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::LoggingIn)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AuthState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Thread-safe auth store.
pub struct AuthSession {
    state: RwLock<AuthState>,
    store: Mutex<EncryptedStore>,
}

impl AuthSession {
    pub fn new(store: EncryptedStore) -> Self {
        Self {
            state: RwLock::new(AuthState::Anonymous),
            store: Mutex::new(store),
        }
    }

    /// Session backed by the storage file under the app data directory.
    pub fn open(client: &ClientConfig) -> Result<Self, WorkflowError> {
        let store = EncryptedStore::open(&config::storage_path(), &client.storage_passphrase)?;
        Ok(Self::new(store))
    }

    pub fn state(&self) -> AuthState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn current(&self) -> Option<UserSession> {
        self.state().session().cloned()
    }

    /// The signed-in user, or `NotSignedIn`.
    pub fn require(&self) -> Result<UserSession, WorkflowError> {
        self.current().ok_or(WorkflowError::NotSignedIn)
    }

    /// Apply `action` and keep the stored token in step with it.
    ///
    /// The state always moves: a sign-in whose token cannot be saved is
    /// recorded as a failure, and a sign-out still signs out even when the
    /// stored token could not be erased.
    pub fn dispatch(&self, action: AuthAction) -> Result<(), WorkflowError> {
        let persisted = match &action {
            AuthAction::LoginSuccess(session) => self.store().set_item(TOKEN_KEY, &session.token),
            AuthAction::Logout => self.store().remove_item(TOKEN_KEY),
            AuthAction::LoginStart | AuthAction::LoginFailure(_) => Ok(()),
        };
        let action = match (&persisted, action) {
            (Err(err), AuthAction::LoginSuccess(_)) => {
                tracing::error!(error = %err, "Could not save session token");
                AuthAction::LoginFailure(format!("Could not save session: {err}"))
            }
            (Err(err), action) => {
                tracing::error!(error = %err, "Could not erase session token");
                action
            }
            (Ok(()), action) => action,
        };
        self.reduce(action);
        persisted.map_err(WorkflowError::from)
    }

    fn reduce(&self, action: AuthAction) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let current = std::mem::take(&mut *state);
        *state = current.reduce(action);
    }

    pub fn login(
        &self,
        api: &dyn HospitalApi,
        username: &str,
        password: &str,
    ) -> Result<UserSession, WorkflowError> {
        let username = require_text("username", username)?;
        if password.is_empty() {
            return Err(ValidationError::missing("password").into());
        }

        self.dispatch(AuthAction::LoginStart)?;
        // The login form loads the backend's public key; nothing is encrypted with it.
        if let Err(err) = api.public_key() {
            tracing::warn!(error = %err, "Public key unavailable");
        }

        let request = LoginRequest {
            username,
            password: password.to_string(),
        };
        match api.login(&request) {
            Ok(resp) => {
                let session = UserSession {
                    user_id: resp.id,
                    username: resp.username,
                    role: resp.role,
                    token: resp.token,
                };
                self.dispatch(AuthAction::LoginSuccess(session.clone()))?;
                tracing::info!(user_id = session.user_id, role = %session.role, "Signed in");
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Sign-in rejected");
                self.dispatch(AuthAction::LoginFailure(err.to_string()))?;
                Err(err.into())
            }
        }
    }

    /// Resume from the stored token. A rejected token is discarded.
    pub fn restore(&self, api: &dyn HospitalApi) -> Result<Option<UserSession>, WorkflowError> {
        let Some(token) = self.store().get_item(TOKEN_KEY) else {
            return Ok(None);
        };
        match api.me() {
            Ok(profile) => {
                let session = UserSession {
                    user_id: profile.id,
                    username: profile.username,
                    role: profile.role,
                    token,
                };
                self.dispatch(AuthAction::LoginSuccess(session.clone()))?;
                tracing::info!(user_id = session.user_id, "Session restored");
                Ok(Some(session))
            }
            Err(err) if err.is_authorization() => {
                tracing::info!("Stored token rejected, clearing it");
                self.dispatch(AuthAction::Logout)?;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn logout(&self) -> Result<(), WorkflowError> {
        self.dispatch(AuthAction::Logout)?;
        tracing::info!("Signed out");
        Ok(())
    }

    fn store(&self) -> std::sync::MutexGuard<'_, EncryptedStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenSource for AuthSession {
    fn bearer_token(&self) -> Option<String> {
        self.current()
            .map(|s| s.token)
            .or_else(|| self.store().get_item(TOKEN_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, InMemoryBackend};

    fn doctor_session() -> UserSession {
        UserSession {
            user_id: 5,
            username: "dr.demir".into(),
            role: Role::Doctor,
            token: "tok".into(),
        }
    }

    #[test]
    fn reducer_follows_login_lifecycle() {
        let state = AuthState::default().reduce(AuthAction::LoginStart);
        assert!(state.is_loading());
        let state = state.reduce(AuthAction::LoginFailure("bad password".into()));
        assert_eq!(state.error(), Some("bad password"));
        let state = state.reduce(AuthAction::LoginSuccess(doctor_session()));
        assert_eq!(state.session().map(|s| s.user_id), Some(5));
        assert_eq!(state.reduce(AuthAction::Logout), AuthState::Anonymous);
    }

    #[test]
    fn debug_output_hides_token() {
        let printed = format!("{:?}", doctor_session());
        assert!(!printed.contains("tok\""));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn login_stores_token_and_logout_clears_it() {
        let api = InMemoryBackend::new();
        api.seed_user("dr.demir", "pw", Role::Doctor, "Ayse", "Demir");
        let auth = AuthSession::new(EncryptedStore::ephemeral());

        let session = auth.login(&api, "dr.demir", "pw").unwrap();
        assert_eq!(session.role, Role::Doctor);
        assert_eq!(auth.bearer_token(), Some(session.token.clone()));

        auth.logout().unwrap();
        assert_eq!(auth.state(), AuthState::Anonymous);
        assert_eq!(auth.bearer_token(), None);
    }

    #[test]
    fn failed_login_records_message() {
        let api = InMemoryBackend::new();
        let auth = AuthSession::new(EncryptedStore::ephemeral());
        let err = auth.login(&api, "ghost", "pw").unwrap_err();
        assert!(matches!(err, WorkflowError::Api(ApiError::BadRequest(_))));
        assert!(auth.state().error().is_some());
        assert!(matches!(auth.require(), Err(WorkflowError::NotSignedIn)));
    }

    #[test]
    fn blank_username_is_rejected_before_any_call() {
        let api = InMemoryBackend::new();
        let auth = AuthSession::new(EncryptedStore::ephemeral());
        assert!(matches!(
            auth.login(&api, "  ", "pw"),
            Err(WorkflowError::Validation(_))
        ));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn unsavable_token_ends_in_failure_not_loading() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let store = EncryptedStore::open_with_iterations(&blocker.join("storage.enc"), "k", 1_000);

        let api = InMemoryBackend::new();
        api.seed_user("d", "pw", Role::Doctor, "Deniz", "Ak");
        let auth = AuthSession::new(store.unwrap());

        let err = auth.login(&api, "d", "pw").unwrap_err();
        assert!(matches!(err, WorkflowError::Storage(_)));
        let state = auth.state();
        assert!(!state.is_loading());
        assert!(state.error().is_some_and(|m| m.contains("Could not save session")));
        assert_eq!(auth.bearer_token(), None);
    }

    fn sign_up_form() -> AccountForm {
        AccountForm {
            username: "123 456 789 01".into(),
            password: "secret1".into(),
            confirm_password: None,
            name: " Ahmet ".into(),
            surname: "Yilmaz".into(),
            email: "ahmet@example.com".into(),
            phone: "05321234567".into(),
            address: "Izmir".into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1),
            blood_group: Some(BloodGroup::ZeroNegative),
            national_id: "12345678901".into(),
        }
    }

    #[test]
    fn account_form_normalizes_and_checks_fields() {
        let request = sign_up_form().validate().unwrap();
        assert_eq!(request.username, "12345678901");
        assert_eq!(request.details.name, "Ahmet");

        let cases: [(fn(&mut AccountForm), &str); 7] = [
            (|f| f.password = "12345".into(), "password"),
            (|f| f.confirm_password = Some("other".into()), "confirmPassword"),
            (|f| f.email = "ahmet@".into(), "email"),
            (|f| f.phone = "12345".into(), "phone"),
            (|f| f.birth_date = None, "birthDate"),
            (|f| f.blood_group = None, "bloodGroup"),
            (|f| f.national_id = "1234".into(), "nationalId"),
        ];
        for (break_it, field) in cases {
            let mut form = sign_up_form();
            break_it(&mut form);
            assert_eq!(form.validate().unwrap_err().field(), Some(field));
        }

        let mut confirmed = sign_up_form();
        confirmed.confirm_password = Some("secret1".into());
        assert!(confirmed.validate().is_ok());
    }

    #[test]
    fn registered_patient_can_sign_in() {
        let api = InMemoryBackend::new();
        register(&api, &sign_up_form()).unwrap();
        let auth = AuthSession::new(EncryptedStore::ephemeral());
        let session = auth.login(&api, "12345678901", "secret1").unwrap();
        assert_eq!(session.role, Role::Patient);

        let err = register(&api, &sign_up_form()).unwrap_err();
        assert!(matches!(err, WorkflowError::Api(ApiError::Conflict(_))));
    }

    #[test]
    fn invalid_registration_makes_no_call() {
        let api = InMemoryBackend::new();
        let mut form = sign_up_form();
        form.username = "   ".into();
        assert!(matches!(register(&api, &form), Err(WorkflowError::Validation(_))));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn restore_uses_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.enc");
        let api = InMemoryBackend::new();
        api.seed_user("sec", "pw", Role::Secretary, "Elif", "Arslan");

        let open = || EncryptedStore::open_with_iterations(&path, "k", 1_000).unwrap();
        let first = AuthSession::new(open());
        let token = first.login(&api, "sec", "pw").unwrap().token;

        let second = AuthSession::new(open());
        assert_eq!(second.bearer_token(), Some(token.clone()));
        let restored = second.restore(&api).unwrap().unwrap();
        assert_eq!(restored.role, Role::Secretary);
        assert_eq!(restored.token, token);
    }

    #[test]
    fn restore_drops_rejected_token() {
        let api = InMemoryBackend::new();
        api.seed_user("pat", "pw", Role::Patient, "Ali", "Can");
        let auth = AuthSession::new(EncryptedStore::ephemeral());
        auth.login(&api, "pat", "pw").unwrap();
        auth.dispatch(AuthAction::LoginStart).unwrap();
        api.expire_session();

        assert_eq!(auth.restore(&api).unwrap(), None);
        assert_eq!(auth.bearer_token(), None);
    }

    #[test]
    fn restore_without_token_makes_no_call() {
        let api = InMemoryBackend::new();
        let auth = AuthSession::new(EncryptedStore::ephemeral());
        assert_eq!(auth.restore(&api).unwrap(), None);
        assert!(api.calls().is_empty());
    }
}
