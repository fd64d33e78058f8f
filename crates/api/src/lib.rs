//! HTTP surface for student progress tracking.
//!
//! Routes validate and normalize input, resolve the caller through an
//! [`auth::Authenticator`], and hand off to [`services::ProgressService`].

#![forbid(unsafe_code)]

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use auth::{AuthError, AuthUser, Authenticator, JwtAuthenticator};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
