pub mod auth;
pub mod error;
pub mod scheduling;
pub mod time;

pub use error::{AppError, ServiceError, ServiceResult};
pub use scheduling::*;
pub use time::ClockTime;
