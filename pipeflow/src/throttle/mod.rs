//! Rate limiting of element flow.

mod limit;
mod limiter;

pub use limit::{limit, limit_with_context, throttle, Admission, LimitOptions, Throttle};
pub use limiter::{RateLimiter, TokenBucket};
