//! Conversion of workflow outcomes into user-facing notifications.
//!
//! Validation problems are shown inline next to the field, backend failures
//! as a toast, missing treatment context as a blocking alert, and expired
//! sessions as a prompt to sign in again.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Inline,
    Toast,
    Alert,
    Relogin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    /// Form field an inline message belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            field: None,
        }
    }

    fn of(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
        }
    }
}

pub fn notify_error(err: &WorkflowError) -> Notification {
    match err {
        WorkflowError::Validation(v) => Notification {
            kind: NotificationKind::Inline,
            message: v.to_string(),
            field: v.field().map(String::from),
        },
        WorkflowError::Blocked(v) => Notification::of(NotificationKind::Alert, v.to_string()),
        WorkflowError::Api(api) if api.is_authorization() => {
            Notification::of(NotificationKind::Relogin, api.to_string())
        }
        WorkflowError::NotSignedIn => {
            Notification::of(NotificationKind::Relogin, "Please sign in to continue")
        }
        WorkflowError::Api(_)
        | WorkflowError::Storage(_)
        | WorkflowError::Io(_)
        | WorkflowError::NotFound(_) => Notification::of(NotificationKind::Toast, err.to_string()),
    }
}

/// Where notifications end up. The dashboard shell supplies its own.
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

/// Collects notifications in memory; the shell drains it after each action.
#[derive(Default)]
pub struct Inbox {
    items: Mutex<Vec<Notification>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for Inbox {
    fn notify(&self, notification: Notification) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

/// Writes notifications to the log. Used by headless tools.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => tracing::info!(message = %notification.message, "success"),
            NotificationKind::Inline => {
                tracing::warn!(
                    field = ?notification.field,
                    message = %notification.message,
                    "invalid input"
                )
            }
            NotificationKind::Toast | NotificationKind::Alert => {
                tracing::error!(
                    kind = ?notification.kind,
                    message = %notification.message,
                    "action failed"
                )
            }
            NotificationKind::Relogin => {
                tracing::warn!(message = %notification.message, "sign-in required")
            }
        }
    }
}

/// Report the outcome of a user action and hand back the value on success.
pub fn report<T>(
    notifier: &dyn Notifier,
    result: Result<T, WorkflowError>,
    success_message: Option<&str>,
) -> Option<T> {
    match result {
        Ok(value) => {
            if let Some(message) = success_message {
                notifier.notify(Notification::success(message));
            }
            Some(value)
        }
        Err(err) => {
            notifier.notify(notify_error(&err));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::ValidationError;

    #[test]
    fn validation_is_inline_with_field() {
        let n = notify_error(&ValidationError::missing("doctorId").into());
        assert_eq!(n.kind, NotificationKind::Inline);
        assert_eq!(n.field.as_deref(), Some("doctorId"));
    }

    #[test]
    fn blocked_becomes_alert() {
        let n = notify_error(&WorkflowError::Blocked(ValidationError::missing("treatmentType")));
        assert_eq!(n.kind, NotificationKind::Alert);
        assert_eq!(n.message, "treatmentType is required");
    }

    #[test]
    fn backend_failure_is_toast_with_message() {
        let err = ApiError::from_response(500, r#"{"message":"Database unavailable"}"#);
        let n = notify_error(&err.into());
        assert_eq!(n.kind, NotificationKind::Toast);
        assert!(n.message.contains("Database unavailable"));
    }

    #[test]
    fn auth_failures_prompt_relogin() {
        assert_eq!(notify_error(&ApiError::Unauthorized.into()).kind, NotificationKind::Relogin);
        assert_eq!(
            notify_error(&ApiError::Forbidden("x".into()).into()).kind,
            NotificationKind::Relogin
        );
    }

    #[test]
    fn report_routes_both_outcomes() {
        let inbox = Inbox::new();
        assert_eq!(report(&inbox, Ok(5), Some("Saved")), Some(5));
        assert_eq!(report::<()>(&inbox, Err(WorkflowError::NotSignedIn), None), None);

        let seen = inbox.drain();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Notification::success("Saved"));
        assert_eq!(seen[1].kind, NotificationKind::Relogin);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn inbox_keeps_collecting_after_poisoning() {
        let inbox = std::sync::Arc::new(Inbox::new());
        let poisoner = inbox.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.items.lock().unwrap();
            panic!("poison the inbox");
        })
        .join();
        assert!(inbox.items.is_poisoned());

        inbox.notify(Notification::success("Saved"));
        assert_eq!(inbox.drain(), vec![Notification::success("Saved")]);
    }
}
