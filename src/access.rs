//! Which roles may open which dashboard page.

use serde::Serialize;

use crate::models::Role;
use crate::session::AuthState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Page {
    Dashboard,
    TechniciansManagement,
    AdminManagement,
    DoctorManagement,
    PatientManagement,
    SecretaryManagement,
    PrescriptionManagement,
    Profile,
}

impl Page {
    pub const ALL: &'static [Page] = &[
        Page::Dashboard,
        Page::TechniciansManagement,
        Page::AdminManagement,
        Page::DoctorManagement,
        Page::PatientManagement,
        Page::SecretaryManagement,
        Page::PrescriptionManagement,
        Page::Profile,
    ];

    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            Page::Dashboard => &[Role::Admin, Role::Doctor, Role::Secretary],
            Page::TechniciansManagement => &[Role::Technician],
            Page::AdminManagement => &[Role::Admin],
            Page::DoctorManagement => &[Role::Doctor],
            Page::PatientManagement => &[Role::Patient],
            Page::SecretaryManagement => &[Role::Secretary],
            Page::PrescriptionManagement => &[Role::Doctor],
            Page::Profile => Role::ALL,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Page::Dashboard => "/dashboard",
            Page::TechniciansManagement => "/technicians",
            Page::AdminManagement => "/admin",
            Page::DoctorManagement => "/doctor",
            Page::PatientManagement => "/patient",
            Page::SecretaryManagement => "/secretary",
            Page::PrescriptionManagement => "/prescriptions",
            Page::Profile => "/profile",
        }
    }
}

pub fn can_access(role: Role, page: Page) -> bool {
    page.allowed_roles().contains(&role)
}

/// Pages shown in the sidebar for `role`, in menu order.
pub fn menu_for(role: Role) -> Vec<Page> {
    Page::ALL.iter().copied().filter(|p| can_access(role, *p)).collect()
}

/// Page a role lands on after signing in.
pub fn home_page(role: Role) -> Page {
    match role {
        Role::Admin => Page::AdminManagement,
        Role::Doctor => Page::DoctorManagement,
        Role::Patient => Page::PatientManagement,
        Role::Secretary => Page::SecretaryManagement,
        Role::Technician => Page::TechniciansManagement,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    Unauthorized,
}

/// Protected-route check for the current auth state.
pub fn guard(state: &AuthState, page: Page) -> RouteDecision {
    match state.session() {
        None => RouteDecision::RedirectToLogin,
        Some(session) if can_access(session.role, page) => RouteDecision::Allow,
        Some(session) => {
            tracing::warn!(role = %session.role, page = ?page, "Page denied for role");
            RouteDecision::Unauthorized
        }
    }
}
