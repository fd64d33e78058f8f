use std::sync::Arc;

use services::ProgressService;

use crate::auth::Authenticator;

/// Shared, immutable handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub progress: Arc<ProgressService>,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    #[must_use]
    pub fn new(progress: Arc<ProgressService>, auth: Arc<dyn Authenticator>) -> Self {
        Self { progress, auth }
    }
}
