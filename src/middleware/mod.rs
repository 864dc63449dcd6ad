mod error_handler;
mod rate_limit;

pub use error_handler::log_errors;
pub use rate_limit::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET, rate_limit};
