mod auth;
mod error_handler;
mod guard;
mod rate_limit;

pub use auth::AuthGuard;
pub use error_handler::log_errors;
pub use guard::{Guard, GuardChain, RequestContext, guard_requests};
pub use rate_limit::{Decision, LIMIT_HEADER, REMAINING_HEADER, RateLimitGuard, RateLimiter};
