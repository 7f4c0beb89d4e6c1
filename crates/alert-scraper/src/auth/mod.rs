//! Authentication for the Ops Manager API.
//!
//! Provides the API key pair and the HTTP digest handshake.

mod credentials;
mod digest;

pub use credentials::Credentials;
pub use digest::{generate_cnonce, Algorithm, DigestChallenge};
