use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::{Schedule, Session, Therapist};

use crate::store::{SchedulingStore, SessionFilter, StoreError, StoreResult, Transaction, Write};

#[derive(Default)]
struct MemoryState {
    therapists: HashMap<Uuid, Therapist>,
    schedules: BTreeMap<(Uuid, NaiveDate), Schedule>,
    sessions: HashMap<Uuid, Session>,
}

/// Process-local store. A commit holds the write lock while it checks
/// preconditions and applies writes, so batches are serialized.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_schedule_precondition(
    state: &MemoryState,
    schedule: &Schedule,
    expected_version: Option<u64>,
) -> StoreResult<()> {
    let key = (schedule.therapist_id, schedule.date);
    let current = state.schedules.get(&key).map(|existing| existing.version);

    if current != expected_version {
        return Err(StoreError::Conflict(format!(
            "schedule for therapist {} on {} is at version {:?}, expected {:?}",
            schedule.therapist_id, schedule.date, current, expected_version
        )));
    }

    Ok(())
}

fn check_session_precondition(
    state: &MemoryState,
    session: &Session,
    expected_version: Option<u64>,
) -> StoreResult<()> {
    let current = state.sessions.get(&session.id).map(|existing| existing.version);

    if current != expected_version {
        return Err(StoreError::Conflict(format!(
            "session {} is at version {:?}, expected {:?}",
            session.id, current, expected_version
        )));
    }

    Ok(())
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    async fn get_therapist(&self, therapist_id: Uuid) -> StoreResult<Option<Therapist>> {
        Ok(self.state.read().await.therapists.get(&therapist_id).cloned())
    }

    async fn list_therapists(&self) -> StoreResult<Vec<Therapist>> {
        let mut therapists: Vec<Therapist> = self.state.read().await.therapists.values().cloned().collect();
        therapists.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(therapists)
    }

    async fn get_schedule(&self, therapist_id: Uuid, date: NaiveDate) -> StoreResult<Option<Schedule>> {
        Ok(self.state.read().await.schedules.get(&(therapist_id, date)).cloned())
    }

    async fn list_schedules(
        &self,
        therapist_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Schedule>> {
        if from > to {
            return Ok(Vec::new());
        }

        let state = self.state.read().await;
        Ok(state
            .schedules
            .range((therapist_id, from)..=(therapist_id, to))
            .map(|(_, schedule)| schedule.clone())
            .collect())
    }

    async fn get_session(&self, session_id: Uuid) -> StoreResult<Option<Session>> {
        Ok(self.state.read().await.sessions.get(&session_id).cloned())
    }

    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .state
            .read()
            .await
            .sessions
            .values()
            .filter(|session| filter.matches(session))
            .cloned()
            .collect();
        sessions.sort_by_key(|session| (session.date, session.start_time));
        Ok(sessions)
    }

    async fn commit(&self, transaction: Transaction) -> StoreResult<()> {
        let mut state = self.state.write().await;

        for write in transaction.writes() {
            match write {
                Write::PutSchedule { schedule, expected_version } => {
                    check_schedule_precondition(&state, schedule, *expected_version)?
                }
                Write::PutSession { session, expected_version } => {
                    check_session_precondition(&state, session, *expected_version)?
                }
                Write::PutTherapist(_) => {}
            }
        }

        let writes = transaction.into_writes();
        debug!("Applying {} writes to memory store", writes.len());

        for write in writes {
            match write {
                Write::PutTherapist(therapist) => {
                    state.therapists.insert(therapist.id, therapist);
                }
                Write::PutSchedule { mut schedule, expected_version } => {
                    schedule.version = expected_version.unwrap_or(0) + 1;
                    state
                        .schedules
                        .insert((schedule.therapist_id, schedule.date), schedule);
                }
                Write::PutSession { mut session, expected_version } => {
                    session.version = expected_version.unwrap_or(0) + 1;
                    state.sessions.insert(session.id, session);
                }
            }
        }

        Ok(())
    }
}
