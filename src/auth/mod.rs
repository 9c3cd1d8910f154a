//! Authentication module
//!
//! Credentials are applied per request by the `Authenticator`. Validating
//! them against the upstream happens once, when the record source connects.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, FIDOO_API_KEY_HEADER};
