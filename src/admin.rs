//! Admin dashboard: staff accounts (admins, doctors, technicians) and the
//! patient profile lookup.
//!
//! A [`StaffDirectory`] holds one family's table. Like the reservation
//! list, it is refetched after every successful change.

use crate::api::HospitalApi;
use crate::error::WorkflowError;
use crate::models::validation::{require_email, require_national_id, require_phone, require_text};
use crate::models::{AccountRecord, AccountUpdate, StaffKind, StaffRegistration, ValidationError};
use crate::session::{AccountForm, MIN_PASSWORD_LEN};

/// A staff registration form: the account part plus the fields of its family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffForm {
    pub kind: StaffKind,
    pub account: AccountForm,
    /// Doctors only.
    pub speciality: String,
    pub diploma_no: String,
    /// Technicians only.
    pub department: String,
    pub specialization: String,
}

impl StaffForm {
    pub fn new(kind: StaffKind) -> Self {
        Self {
            kind,
            account: AccountForm {
                confirm_password: Some(String::new()),
                ..AccountForm::default()
            },
            speciality: String::new(),
            diploma_no: String::new(),
            department: String::new(),
            specialization: String::new(),
        }
    }

    pub fn validate(&self) -> Result<StaffRegistration, ValidationError> {
        let account = self.account.validate()?;
        let (speciality, diploma_no, department, specialization) = match self.kind {
            StaffKind::Admin => (None, None, None, None),
            StaffKind::Doctor => (
                Some(require_text("speciality", &self.speciality)?),
                Some(require_text("diplomaNo", &self.diploma_no)?),
                None,
                None,
            ),
            StaffKind::Technician => (
                None,
                None,
                Some(require_text("department", &self.department)?),
                Some(require_text("specialization", &self.specialization)?),
            ),
        };
        Ok(StaffRegistration {
            account,
            speciality,
            diploma_no,
            department,
            specialization,
        })
    }
}

/// Edits are partial, but whatever is set must still be well formed.
fn check_update(update: &AccountUpdate) -> Result<(), ValidationError> {
    if update.is_empty() {
        return Err(ValidationError::invalid("update", "nothing to change"));
    }
    let texts = [
        ("username", &update.username),
        ("name", &update.name),
        ("surname", &update.surname),
        ("address", &update.address),
    ];
    for (field, value) in texts {
        if let Some(value) = value {
            require_text(field, value)?;
        }
    }
    if let Some(password) = &update.password {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::invalid(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
    }
    if let Some(email) = &update.email {
        require_email("email", email)?;
    }
    if let Some(phone) = &update.phone {
        require_phone("phone", phone)?;
    }
    if let Some(national_id) = &update.national_id {
        require_national_id("nationalId", national_id)?;
    }
    Ok(())
}

/// One staff family's table plus the operations that change it.
#[derive(Debug, Clone)]
pub struct StaffDirectory {
    kind: StaffKind,
    members: Vec<AccountRecord>,
}

impl StaffDirectory {
    pub fn new(kind: StaffKind) -> Self {
        Self {
            kind,
            members: Vec::new(),
        }
    }

    pub fn kind(&self) -> StaffKind {
        self.kind
    }

    pub fn members(&self) -> &[AccountRecord] {
        &self.members
    }

    pub fn find(&self, id: i64) -> Option<&AccountRecord> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Rows whose name, surname or username contain `needle`.
    pub fn search(&self, needle: &str) -> Vec<&AccountRecord> {
        self.members.iter().filter(|m| m.matches(needle)).collect()
    }

    pub fn refresh(&mut self, api: &dyn HospitalApi) -> Result<&[AccountRecord], WorkflowError> {
        self.members = api.list_staff(self.kind)?;
        Ok(&self.members)
    }

    /// Fresh copy from the backend, for the edit form.
    pub fn load(&self, api: &dyn HospitalApi, id: i64) -> Result<AccountRecord, WorkflowError> {
        Ok(api.get_staff(self.kind, id)?)
    }

    pub fn register(
        &mut self,
        api: &dyn HospitalApi,
        form: &StaffForm,
    ) -> Result<(), WorkflowError> {
        if form.kind != self.kind {
            return Err(ValidationError::invalid(
                "kind",
                format!("a {} form cannot add to the {} list", form.kind, self.kind),
            )
            .into());
        }
        let registration = form.validate().inspect_err(|err| {
            tracing::warn!(kind = %self.kind, error = %err, "Staff form rejected");
        })?;
        api.create_staff(self.kind, &registration)?;
        tracing::info!(
            kind = %self.kind,
            username = %registration.account.username,
            "Staff registered"
        );
        self.refresh(api)?;
        Ok(())
    }

    pub fn update(
        &mut self,
        api: &dyn HospitalApi,
        id: i64,
        update: &AccountUpdate,
    ) -> Result<(), WorkflowError> {
        check_update(update).inspect_err(|err| {
            tracing::warn!(kind = %self.kind, staff_id = id, error = %err, "Staff edit rejected");
        })?;
        api.update_staff(self.kind, id, update)?;
        tracing::info!(kind = %self.kind, staff_id = id, "Staff updated");
        self.refresh(api)?;
        Ok(())
    }

    pub fn remove(&mut self, api: &dyn HospitalApi, id: i64) -> Result<(), WorkflowError> {
        api.delete_staff(self.kind, id)?;
        tracing::info!(kind = %self.kind, staff_id = id, "Staff deleted");
        self.refresh(api)?;
        Ok(())
    }
}

pub fn patient_profile(
    api: &dyn HospitalApi,
    patient_id: i64,
) -> Result<AccountRecord, WorkflowError> {
    Ok(api.patient_profile(patient_id)?)
}
