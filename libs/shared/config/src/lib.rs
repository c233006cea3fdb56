use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use shared_models::ClockTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Supabase,
}

impl FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(DatabaseBackend::Memory),
            "supabase" => Ok(DatabaseBackend::Supabase),
            other => Err(format!("unknown database backend '{}'", other)),
        }
    }
}

/// How the generator treats a date that already has a schedule document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegenerateMode {
    /// Keep customized and booked slots, fill the rest from consulting hours.
    Preserve,
    /// Overwrite the whole slot list for the date.
    Replace,
}

impl FromStr for RegenerateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(RegenerateMode::Preserve),
            "replace" => Ok(RegenerateMode::Replace),
            other => Err(format!("unknown regenerate mode '{}'", other)),
        }
    }
}

const LUNCH_START: ClockTime = ClockTime::NOON;
const LUNCH_END: ClockTime = ClockTime::at(14, 0);

#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    pub slot_duration_minutes: u16,
    pub lunch_start: ClockTime,
    pub lunch_end: ClockTime,
    pub default_generation_days: u32,
    pub regenerate_mode: RegenerateMode,
    pub booking_max_retries: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_duration_minutes: 60,
            lunch_start: LUNCH_START,
            lunch_end: LUNCH_END,
            default_generation_days: 30,
            regenerate_mode: RegenerateMode::Preserve,
            booking_max_retries: 3,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            slot_duration_minutes: parse_env("SLOT_DURATION_MINUTES", defaults.slot_duration_minutes),
            lunch_start: parse_env("LUNCH_START", defaults.lunch_start),
            lunch_end: parse_env("LUNCH_END", defaults.lunch_end),
            default_generation_days: parse_env("SCHEDULE_GENERATION_DAYS", defaults.default_generation_days),
            regenerate_mode: parse_env("SCHEDULE_REGENERATE_MODE", defaults.regenerate_mode),
            booking_max_retries: parse_env("BOOKING_MAX_RETRIES", defaults.booking_max_retries),
        };

        if config.slot_duration_minutes == 0 || config.lunch_start >= config.lunch_end {
            warn!("Invalid scheduling configuration, falling back to defaults");
            return defaults;
        }

        config
    }
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub database_backend: DatabaseBackend,
    pub server_port: u16,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            database_backend: parse_env("DATABASE_BACKEND", DatabaseBackend::Memory),
            server_port: parse_env("SERVER_PORT", 3000),
            scheduling: SchedulingConfig::from_env(),
        };

        if config.database_backend == DatabaseBackend::Supabase && !config.is_configured() {
            warn!("Supabase backend selected but not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_role_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_defaults_match_clinic_hours() {
        let config = SchedulingConfig::default();
        assert_eq!(config.slot_duration_minutes, 60);
        assert_eq!(config.lunch_start.to_string(), "12:00 PM");
        assert_eq!(config.lunch_end.to_string(), "02:00 PM");
        assert_eq!(config.default_generation_days, 30);
        assert_eq!(config.regenerate_mode, RegenerateMode::Preserve);
    }

    #[test]
    fn parses_enum_settings() {
        assert_eq!("Supabase".parse::<DatabaseBackend>(), Ok(DatabaseBackend::Supabase));
        assert_eq!("replace".parse::<RegenerateMode>(), Ok(RegenerateMode::Replace));
        assert!("sqlite".parse::<DatabaseBackend>().is_err());
    }
}
