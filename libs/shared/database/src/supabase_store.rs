use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{ClockTime, ConsultingHour, Schedule, Session, SessionStatus, Therapist, TimeSlot};

use crate::store::{SchedulingStore, SessionFilter, StoreError, StoreResult, Transaction, Write};
use crate::supabase::{SupabaseClient, SupabaseHttpError};

const COMMIT_RPC_PATH: &str = "/rest/v1/rpc/commit_scheduling_transaction";

// ==============================================================================
// ROW SHAPES (snake_case columns, embedded lists stored as jsonb)
// ==============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct TherapistRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    #[serde(default)]
    consulting_hours: Vec<ConsultingHour>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TherapistRow> for Therapist {
    fn from(row: TherapistRow) -> Self {
        Therapist {
            id: row.id,
            name: row.name,
            email: row.email,
            consulting_hours: row.consulting_hours,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<Therapist> for TherapistRow {
    fn from(therapist: Therapist) -> Self {
        TherapistRow {
            id: therapist.id,
            name: therapist.name,
            email: therapist.email,
            consulting_hours: therapist.consulting_hours,
            is_active: therapist.is_active,
            created_at: therapist.created_at,
            updated_at: therapist.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ScheduleRow {
    id: Uuid,
    therapist_id: Uuid,
    date: NaiveDate,
    #[serde(default)]
    slots: Vec<TimeSlot>,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl From<ScheduleRow> for Schedule {
    fn from(row: ScheduleRow) -> Self {
        Schedule {
            id: row.id,
            therapist_id: row.therapist_id,
            date: row.date,
            slots: row.slots,
            version: row.version,
            updated_at: row.updated_at,
        }
    }
}

impl From<Schedule> for ScheduleRow {
    fn from(schedule: Schedule) -> Self {
        ScheduleRow {
            id: schedule.id,
            therapist_id: schedule.therapist_id,
            date: schedule.date,
            slots: schedule.slots,
            version: schedule.version,
            updated_at: schedule.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    therapist_id: Uuid,
    date: NaiveDate,
    start_time: ClockTime,
    end_time: ClockTime,
    status: SessionStatus,
    #[serde(default)]
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            user_id: row.user_id,
            therapist_id: row.therapist_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<Session> for SessionRow {
    fn from(session: Session) -> Self {
        SessionRow {
            id: session.id,
            user_id: session.user_id,
            therapist_id: session.therapist_id,
            date: session.date,
            start_time: session.start_time,
            end_time: session.end_time,
            status: session.status,
            version: session.version,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

// ==============================================================================
// STORE
// ==============================================================================

/// PostgREST-backed store. Reads go through table endpoints; a commit is one
/// RPC call to a database function that applies the batch inside a single
/// Postgres transaction and raises `PT409` on a version mismatch.
pub struct SupabaseStore {
    supabase: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn with_client(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    async fn fetch_rows<T>(&self, path: &str) -> StoreResult<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(map_http_error)?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .collect()
    }

    fn encode_write(write: Write) -> StoreResult<Value> {
        let encoded = match write {
            Write::PutTherapist(therapist) => json!({
                "table": "therapists",
                "row": serde_json::to_value(TherapistRow::from(therapist))?,
            }),
            Write::PutSchedule { schedule, expected_version } => json!({
                "table": "schedules",
                "expected_version": expected_version,
                "row": serde_json::to_value(ScheduleRow::from(schedule))?,
            }),
            Write::PutSession { session, expected_version } => json!({
                "table": "sessions",
                "expected_version": expected_version,
                "row": serde_json::to_value(SessionRow::from(session))?,
            }),
        };
        Ok(encoded)
    }
}

fn map_http_error(err: anyhow::Error) -> StoreError {
    match err.downcast_ref::<SupabaseHttpError>() {
        Some(http) if http.status == StatusCode::CONFLICT => StoreError::Conflict(http.body.clone()),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn session_query(filter: &SessionFilter) -> String {
    let mut path = String::from("/rest/v1/sessions?order=date.asc");
    if let Some(user_id) = filter.user_id {
        path.push_str(&format!("&user_id=eq.{}", user_id));
    }
    if let Some(therapist_id) = filter.therapist_id {
        path.push_str(&format!("&therapist_id=eq.{}", therapist_id));
    }
    if let Some(date) = filter.date {
        path.push_str(&format!("&date=eq.{}", date));
    }
    path
}

#[async_trait]
impl SchedulingStore for SupabaseStore {
    async fn get_therapist(&self, therapist_id: Uuid) -> StoreResult<Option<Therapist>> {
        let path = format!("/rest/v1/therapists?id=eq.{}", therapist_id);
        let rows: Vec<TherapistRow> = self.fetch_rows(&path).await?;
        Ok(rows.into_iter().next().map(Therapist::from))
    }

    async fn list_therapists(&self) -> StoreResult<Vec<Therapist>> {
        let rows: Vec<TherapistRow> = self.fetch_rows("/rest/v1/therapists?order=name.asc").await?;
        Ok(rows.into_iter().map(Therapist::from).collect())
    }

    async fn get_schedule(&self, therapist_id: Uuid, date: NaiveDate) -> StoreResult<Option<Schedule>> {
        let path = format!("/rest/v1/schedules?therapist_id=eq.{}&date=eq.{}", therapist_id, date);
        let rows: Vec<ScheduleRow> = self.fetch_rows(&path).await?;
        Ok(rows.into_iter().next().map(Schedule::from))
    }

    async fn list_schedules(
        &self,
        therapist_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Schedule>> {
        let path = format!(
            "/rest/v1/schedules?therapist_id=eq.{}&date=gte.{}&date=lte.{}&order=date.asc",
            therapist_id, from, to
        );
        let rows: Vec<ScheduleRow> = self.fetch_rows(&path).await?;
        Ok(rows.into_iter().map(Schedule::from).collect())
    }

    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<Session>> {
        let path = format!("/rest/v1/sessions?id=eq.{}", session_id);
        let rows: Vec<SessionRow> = self.fetch_rows(&path).await?;
        Ok(rows.into_iter().next().map(Session::from))
    }

    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<Session>> {
        let rows: Vec<SessionRow> = self.fetch_rows(&session_query(&filter)).await?;
        let mut sessions: Vec<Session> = rows.into_iter().map(Session::from).collect();
        // start_time is stored as "hh:mm AM/PM" text, so order it here
        sessions.sort_by_key(|session| (session.date, session.start_time));
        Ok(sessions)
    }

    async fn commit(&self, transaction: Transaction) -> StoreResult<()> {
        if transaction.is_empty() {
            return Ok(());
        }

        let writes = transaction
            .into_writes()
            .into_iter()
            .map(Self::encode_write)
            .collect::<StoreResult<Vec<Value>>>()?;

        debug!("Committing {} writes through {}", writes.len(), COMMIT_RPC_PATH);

        let result: StoreResult<Value> = self
            .supabase
            .request(Method::POST, COMMIT_RPC_PATH, None, Some(json!({ "p_writes": writes })))
            .await
            .map_err(map_http_error);

        if let Err(StoreError::Conflict(ref body)) = result {
            warn!("Scheduling transaction rejected on version check: {}", body);
        }

        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_query_includes_filters() {
        let user_id = Uuid::new_v4();
        let filter = SessionFilter {
            user_id: Some(user_id),
            therapist_id: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 3),
        };
        let path = session_query(&filter);
        assert!(path.contains(&format!("user_id=eq.{}", user_id)));
        assert!(path.contains("date=eq.2025-03-03"));
        assert!(!path.contains("therapist_id"));
    }

    #[test]
    fn schedule_write_carries_expected_version() {
        let mut schedule = Schedule::new(Uuid::new_v4(), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        schedule.version = 7;
        let value = SupabaseStore::encode_write(Write::PutSchedule {
            expected_version: Some(7),
            schedule,
        })
        .unwrap();
        assert_eq!(value["table"], "schedules");
        assert_eq!(value["expected_version"], 7);
        assert_eq!(value["row"]["date"], "2025-03-03");
    }

    #[test]
    fn session_write_carries_expected_version() {
        let slot = TimeSlot::generated(ClockTime::at(9, 0), ClockTime::at(10, 0));
        let mut session =
            Session::pending(Uuid::new_v4(), Uuid::new_v4(), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(), &slot);

        let insert = SupabaseStore::encode_write(Write::PutSession {
            expected_version: None,
            session: session.clone(),
        })
        .unwrap();
        assert_eq!(insert["table"], "sessions");
        assert!(insert["expected_version"].is_null());

        session.version = 3;
        let update = SupabaseStore::encode_write(Write::PutSession {
            expected_version: Some(3),
            session,
        })
        .unwrap();
        assert_eq!(update["expected_version"], 3);
        assert_eq!(update["row"]["version"], 3);
    }
}
