//! Credential-domain identifiers, consumers, tokens, and nonce records.

pub mod consumer;
pub mod id;
pub mod token;

pub use consumer::*;
pub use id::*;
pub use token::{access::*, nonce::*, request::*, secret::*};
