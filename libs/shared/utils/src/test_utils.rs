use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, DatabaseBackend, SchedulingConfig};
use shared_database::{AppState, MemoryStore};
use shared_models::auth::User;
use shared_models::{ClockTime, ConsultingHour};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub scheduling: SchedulingConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            database_backend: DatabaseBackend::Memory,
            server_port: 0,
            scheduling: self.scheduling.clone(),
        }
    }

    /// Fresh state over an empty in-memory store.
    pub fn to_state(&self) -> AppState {
        AppState::new(self.to_app_config(), Arc::new(MemoryStore::new()))
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::client("client@example.com")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, "client")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).unwrap_or_else(|_| Uuid::nil())
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

/// Builds HS256 tokens shaped like the ones Supabase issues.
pub struct TokenFactory<'a> {
    secret: &'a str,
}

impl<'a> TokenFactory<'a> {
    pub fn new(secret: &'a str) -> Self {
        Self { secret }
    }

    /// Token for `user` that expires `ttl` from now. A negative ttl yields an expired token.
    pub fn issue(&self, user: &TestUser, ttl: Duration) -> String {
        let issued_at = Utc::now();
        self.sign(&json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "aud": "authenticated",
            "iat": issued_at.timestamp(),
            "exp": (issued_at + ttl).timestamp()
        }))
    }

    pub fn issue_expired(&self, user: &TestUser) -> String {
        self.issue(user, Duration::minutes(-5))
    }

    pub fn sign(&self, claims: &Value) -> String {
        let segments = [json!({ "alg": "HS256", "typ": "JWT" }), claims.clone()]
            .map(|part| URL_SAFE_NO_PAD.encode(part.to_string()))
            .join(".");

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes()).expect("hmac accepts any key length");
        mac.update(segments.as_bytes());

        format!("{}.{}", segments, URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

/// Calendar and consulting-hour fixtures shared by the cell tests.
pub struct ScheduleFixtures;

impl ScheduleFixtures {
    /// A Monday well in the future.
    pub fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 4).expect("valid fixture date")
    }

    pub fn hours(day_of_week: u8, start: &str, end: &str) -> ConsultingHour {
        ConsultingHour {
            day_of_week,
            start_time: ClockTime::parse(start).expect("valid fixture time"),
            end_time: ClockTime::parse(end).expect("valid fixture time"),
            is_enabled: true,
        }
    }

    /// Weekdays 09:00 AM - 05:00 PM.
    pub fn weekday_hours() -> Vec<ConsultingHour> {
        (1..=5).map(|day| Self::hours(day, "09:00 AM", "05:00 PM")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_config_uses_memory_backend() {
        let app_config = TestConfig::default().to_app_config();

        assert_eq!(app_config.database_backend, DatabaseBackend::Memory);
        assert_eq!(app_config.server_port, 0);
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn admin_test_user_maps_to_admin() {
        let admin = TestUser::admin("admin@example.com");
        let user = admin.to_user();

        assert!(user.is_admin());
        assert_eq!(admin.uuid().to_string(), user.id);
        assert!(!TestUser::client("c@example.com").to_user().is_admin());
    }

    #[test]
    fn issued_tokens_have_three_segments() {
        let token = TokenFactory::new("test-secret").issue(&TestUser::default(), Duration::hours(1));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn fixture_monday_is_a_monday() {
        assert_eq!(ScheduleFixtures::monday().weekday(), chrono::Weekday::Mon);
    }
}
