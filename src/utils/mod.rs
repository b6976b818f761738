pub mod client_ip;
pub mod token;

pub use client_ip::client_key;
pub use token::{AuthError, BEARER_PREFIX, Claims, TokenVerifier, strip_bearer};
