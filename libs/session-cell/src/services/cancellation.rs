use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{normalize_store_error, AppState, SchedulingStore, StoreError, Transaction};
use shared_models::{Session, SessionStatus, ServiceError, ServiceResult};
use shared_utils::ids::parse_id;

pub struct CancellationService {
    store: Arc<dyn SchedulingStore>,
    max_retries: u32,
}

impl CancellationService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(Arc::clone(&state.store), state.config.scheduling.booking_max_retries)
    }

    pub fn with_store(store: Arc<dyn SchedulingStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    /// Cancel a pending session on behalf of the user who booked it.
    pub async fn cancel_session(&self, session_id: &str, user_id: &str) -> ServiceResult<Session> {
        let session_id = parse_id("session", session_id)?;
        let user_id = parse_id("user", user_id)?;
        self.cancel(session_id, Some(user_id)).await
    }

    pub async fn cancel_session_as_admin(&self, session_id: &str) -> ServiceResult<Session> {
        let session_id = parse_id("session", session_id)?;
        self.cancel(session_id, None).await
    }

    /// Mark the session cancelled and free its slot in one transaction. The
    /// slot is only released while it still points at this session.
    async fn cancel(&self, session_id: Uuid, owner: Option<Uuid>) -> ServiceResult<Session> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut session = self
                .store
                .get_session(session_id)
                .await
                .map_err(normalize_store_error)?
                .ok_or_else(|| ServiceError::not_found(format!("Session {} not found", session_id)))?;

            if let Some(user_id) = owner {
                if session.user_id != user_id {
                    warn!("User {} tried to cancel session {} they do not own", user_id, session_id);
                    return Err(ServiceError::validation("Session does not belong to this user"));
                }
            }

            if session.status != SessionStatus::Pending {
                return Err(ServiceError::validation(format!(
                    "Only pending sessions can be cancelled, session is {}",
                    session.status
                )));
            }

            session.status = SessionStatus::Cancelled;
            session.updated_at = Utc::now();

            let mut tx = Transaction::new();
            tx.put_session(session.clone());

            let schedule = self
                .store
                .get_schedule(session.therapist_id, session.date)
                .await
                .map_err(normalize_store_error)?;

            match schedule {
                Some(mut schedule) => {
                    let holds_session = schedule
                        .find_slot(session.start_time)
                        .is_some_and(|slot| slot.session_id == Some(session.id));

                    if holds_session {
                        if let Some(slot) = schedule.find_slot_mut(session.start_time) {
                            slot.release();
                        }
                        schedule.touch();
                        tx.put_schedule(schedule);
                    } else {
                        debug!("Slot for session {} already released or removed", session_id);
                    }
                }
                None => debug!("No schedule left for session {} on {}", session_id, session.date),
            }

            match self.store.commit(tx).await {
                Ok(()) => {
                    session.version += 1;
                    info!("Session {} cancelled", session_id);
                    return Ok(session);
                }
                Err(StoreError::Conflict(msg)) if attempt <= self.max_retries => {
                    debug!("Cancellation of session {} conflicted, retrying: {}", session_id, msg);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!("Cancellation of session {} gave up after {} attempts", session_id, attempt);
                    return Err(ServiceError::validation("Session could not be cancelled, try again"));
                }
                Err(e) => return Err(normalize_store_error(e)),
            }
        }
    }
}
