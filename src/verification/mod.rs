pub mod machine;
pub mod service;

pub use service::{ResendError, VerificationService, VerifyError};
