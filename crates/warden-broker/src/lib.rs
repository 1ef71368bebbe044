#![forbid(unsafe_code)]

mod broker;
mod error;
mod flight;
mod rate_limit;

pub use broker::{AccessBroker, AccessRequest, AccessResponse, ReadResponse, RotateResponse};
pub use error::BrokerError;
pub use flight::SingleFlight;
pub use rate_limit::PrincipalRateLimiter;
