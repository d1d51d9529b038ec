//! Client-credentials token issuing and bearer token verification.

pub mod claims;
pub mod secret;
pub mod service;

pub use claims::{AccessClaims, IdClaims, ADMIN_SCOPE};
pub use service::{AuthService, IssuedToken, TokenPair, TokenRequest};
