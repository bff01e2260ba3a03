//! Bearer-token authentication.
//!
//! Verification is stateless: every request is checked on its own and no
//! session table exists on the server.

mod middleware;
mod verifier;

pub use middleware::require_auth;
pub use verifier::{TokenVerifier, INSECURE_FALLBACK_SECRET};
