pub mod rate_limit;
pub mod request_id;
pub mod request_info;

pub use rate_limit::{LimitPolicy, RateLimiter, RateLimiters};
pub use request_id::{CorrelationId, RequestIdExt, RequestIdMiddleware};
pub use request_info::{RequestInfo, RequestInfoMiddleware};
