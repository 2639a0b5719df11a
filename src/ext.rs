//! Public extension contracts for concerns the provider delegates to its host.
//!
//! Consumer registration is the only such concern today: the `register` validation mode hands
//! the inbound request to a caller-supplied [`RegistrationHook`].

pub mod registration;

pub use registration::*;
