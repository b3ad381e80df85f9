// Token acquisition endpoints; no session required
pub mod login;
pub mod signup;

pub use login::login_post;
pub use signup::{send_otp_post, signup_post};
