pub mod access;
pub mod admin;
pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod notify;
pub mod prescription;
pub mod requests;
pub mod reservation;
pub mod session;
pub mod specialties;
pub mod storage;
pub mod treatment;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub use api::{ApiError, HospitalApi, HttpBackend, InMemoryBackend};
pub use config::ClientConfig;
pub use error::WorkflowError;
pub use session::AuthSession;

/// Install the fmt subscriber. `RUST_LOG` wins over the default filter.
/// Calling it twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Wire the auth store and the HTTP backend together: the backend reads its
/// bearer token from the session.
pub fn connect(client: &ClientConfig) -> Result<(Arc<AuthSession>, HttpBackend), WorkflowError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    let session = Arc::new(AuthSession::open(client)?);
    let backend = HttpBackend::new(client, session.clone())?;
    tracing::info!(base_url = backend.base_url(), "Backend configured");
    Ok((session, backend))
}
