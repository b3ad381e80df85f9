// Endpoints behind the session middleware (/api/*). Each handler receives
// the caller as an `Extension<AuthUser>` and re-reads account data from
// the store.
pub mod account;
pub mod analytics;
pub mod posts;
pub mod workflows;

pub use account::*;
pub use analytics::*;
pub use posts::*;
pub use workflows::*;
