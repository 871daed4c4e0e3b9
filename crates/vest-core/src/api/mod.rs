//! API clients for the Vest exchange.

pub mod registration;

pub use registration::{RegistrationClient, RegistrationRequest};
