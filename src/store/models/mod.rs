pub mod account;
pub mod business_profile;
pub mod pending_signup;
pub mod plan;
pub mod post;
pub mod workflow;

pub use account::Account;
pub use business_profile::BusinessProfile;
pub use pending_signup::PendingSignup;
pub use plan::Plan;
pub use post::Post;
pub use workflow::Workflow;
