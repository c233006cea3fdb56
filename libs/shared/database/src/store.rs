use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use shared_models::{Schedule, ServiceError, Session, Therapist};

#[derive(Error, Debug)]
pub enum StoreError {
    /// A write precondition failed: the document changed since it was read.
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Map storage failures into the service error taxonomy.
///
/// A conflict that survives the caller's retries is a business outcome (the
/// document moved under us), everything else is an infrastructure failure.
pub fn normalize_store_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::Conflict(msg) => ServiceError::Validation(format!("Concurrent update detected: {}", msg)),
        StoreError::Backend(msg) => {
            error!("Store backend failure: {}", msg);
            ServiceError::Database(msg)
        }
        StoreError::Serialization(e) => {
            error!("Store serialization failure: {}", e);
            ServiceError::Database(e.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub enum Write {
    PutTherapist(Therapist),
    /// `expected_version: None` requires that no schedule exists yet for
    /// (therapist, date); `Some(v)` requires the stored version to be `v`.
    PutSchedule {
        schedule: Schedule,
        expected_version: Option<u64>,
    },
    /// Same precondition rules as `PutSchedule`, keyed by session id.
    PutSession {
        session: Session,
        expected_version: Option<u64>,
    },
}

/// A batch of writes applied all-or-nothing by [`SchedulingStore::commit`].
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    writes: Vec<Write>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_therapist(&mut self, therapist: Therapist) -> &mut Self {
        self.writes.push(Write::PutTherapist(therapist));
        self
    }

    /// Queue a schedule write guarded by the version it was read at.
    /// A never-persisted schedule (version 0) is written as an insert.
    pub fn put_schedule(&mut self, schedule: Schedule) -> &mut Self {
        let expected_version = (schedule.version > 0).then_some(schedule.version);
        self.writes.push(Write::PutSchedule {
            schedule,
            expected_version,
        });
        self
    }

    /// Queue a session write guarded by the version it was read at.
    pub fn put_session(&mut self, session: Session) -> &mut Self {
        let expected_version = (session.version > 0).then_some(session.version);
        self.writes.push(Write::PutSession {
            session,
            expected_version,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub user_id: Option<Uuid>,
    pub therapist_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

impl SessionFilter {
    pub fn matches(&self, session: &Session) -> bool {
        self.user_id.map_or(true, |id| session.user_id == id)
            && self.therapist_id.map_or(true, |id| session.therapist_id == id)
            && self.date.map_or(true, |date| session.date == date)
    }
}

/// Document storage for therapists, schedules and sessions.
///
/// Reads are plain lookups. All mutation goes through [`commit`], which must
/// check every schedule and session precondition and apply the whole batch
/// atomically, bumping each written document's version by one.
///
/// [`commit`]: SchedulingStore::commit
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn get_therapist(&self, therapist_id: Uuid) -> StoreResult<Option<Therapist>>;

    async fn list_therapists(&self) -> StoreResult<Vec<Therapist>>;

    async fn get_schedule(&self, therapist_id: Uuid, date: NaiveDate) -> StoreResult<Option<Schedule>>;

    /// Schedules with `from <= date <= to`, ordered by date.
    async fn list_schedules(
        &self,
        therapist_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Schedule>>;

    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<Session>>;

    /// Sessions matching the filter, ordered by date then start time.
    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<Session>>;

    async fn commit(&self, transaction: Transaction) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn new_schedules_are_inserts() {
        let mut tx = Transaction::new();
        let mut schedule = Schedule::new(Uuid::new_v4(), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        tx.put_schedule(schedule.clone());
        schedule.version = 4;
        tx.put_schedule(schedule);

        assert_matches!(&tx.writes()[0], Write::PutSchedule { expected_version: None, .. });
        assert_matches!(&tx.writes()[1], Write::PutSchedule { expected_version: Some(4), .. });
    }

    #[test]
    fn session_writes_carry_their_read_version() {
        let mut session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            therapist_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            start_time: shared_models::ClockTime::at(9, 0),
            end_time: shared_models::ClockTime::at(10, 0),
            status: shared_models::SessionStatus::Pending,
            version: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let mut tx = Transaction::new();
        tx.put_session(session.clone());
        session.version = 2;
        tx.put_session(session);

        assert_matches!(&tx.writes()[0], Write::PutSession { expected_version: None, .. });
        assert_matches!(&tx.writes()[1], Write::PutSession { expected_version: Some(2), .. });
    }

    #[test]
    fn conflicts_normalize_to_validation() {
        assert_matches!(
            normalize_store_error(StoreError::Conflict("schedule".into())),
            ServiceError::Validation(_)
        );
        assert_matches!(
            normalize_store_error(StoreError::Backend("timeout".into())),
            ServiceError::Database(_)
        );
    }
}
