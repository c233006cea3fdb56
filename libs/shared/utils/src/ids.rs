use chrono::NaiveDate;
use uuid::Uuid;

use shared_models::{ClockTime, ServiceError};

/// Parse a reference id, naming the entity in the validation message.
pub fn parse_id(kind: &str, raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::validation(format!("Invalid {} id: '{}'", kind, raw)))
}

/// Calendar date in `YYYY-MM-DD` form.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

pub fn parse_time(raw: &str) -> Result<ClockTime, ServiceError> {
    ClockTime::parse(raw)
}
