pub mod mailer;
pub mod signup;

pub use mailer::{HttpMailer, LogMailer, Mailer};
pub use signup::{SignupError, SignupService};
