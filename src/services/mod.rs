pub mod account;
pub mod analytics;
pub mod posts;
pub mod signup;
pub mod validation;
pub mod workflows;

use thiserror::Error;

use crate::auth::{JwtError, PasswordError};
use crate::store::StoreError;

pub use account::AccountService;
pub use analytics::{AnalyticsService, GraphClient};
pub use posts::PostService;
pub use signup::SignupService;
pub use workflows::WorkflowService;

/// Failures shared by the account-scoped services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("config missing")]
    ConfigMissing,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Graph(#[from] analytics::GraphError),

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}
