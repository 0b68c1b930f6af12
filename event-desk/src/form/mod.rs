pub mod registration;

pub use registration::{validate_registration, RegistrationRequest};
