//! Edge-defense middleware.
//!
//! Every inbound request passes through, outermost first: header policy,
//! rate limiter, request guard, access logger. The route handler only runs
//! once all four have admitted the request.

pub mod access_log;
pub mod body_limit;
pub mod headers;
pub mod rate_limit;

pub use access_log::{access_log, detect_flags, AnomalyFlag};
pub use body_limit::content_length_guard;
pub use headers::security_headers;
pub use rate_limit::rate_limit;
