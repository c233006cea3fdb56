use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use shared_database::{normalize_store_error, AppState, SchedulingStore, SessionFilter, StoreError, Transaction};
use shared_models::{Session, SessionStatus, ServiceError, ServiceResult};
use shared_utils::ids::{parse_date, parse_id};

/// Statuses an administrator may move a session to from `current`.
/// Cancellation has its own path and is not listed here.
pub fn allowed_transitions(current: SessionStatus) -> &'static [SessionStatus] {
    match current {
        SessionStatus::Pending => &[SessionStatus::Confirmed],
        SessionStatus::Confirmed => &[SessionStatus::Completed],
        // Terminal
        SessionStatus::Completed | SessionStatus::Cancelled => &[],
    }
}

pub struct SessionLifecycleService {
    store: Arc<dyn SchedulingStore>,
    max_retries: u32,
}

impl SessionLifecycleService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(Arc::clone(&state.store), state.config.scheduling.booking_max_retries)
    }

    pub fn with_store(store: Arc<dyn SchedulingStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    pub async fn get_session(&self, session_id: &str) -> ServiceResult<Session> {
        let session_id = parse_id("session", session_id)?;

        self.store
            .get_session(session_id)
            .await
            .map_err(normalize_store_error)?
            .ok_or_else(|| ServiceError::not_found(format!("Session {} not found", session_id)))
    }

    pub async fn list_user_sessions(&self, user_id: &str) -> ServiceResult<Vec<Session>> {
        let user_id = parse_id("user", user_id)?;

        self.store
            .list_sessions(SessionFilter {
                user_id: Some(user_id),
                ..SessionFilter::default()
            })
            .await
            .map_err(normalize_store_error)
    }

    pub async fn list_therapist_sessions(&self, therapist_id: &str, date: Option<&str>) -> ServiceResult<Vec<Session>> {
        let therapist_id = parse_id("therapist", therapist_id)?;
        let date = date.map(parse_date).transpose()?;

        self.store
            .list_sessions(SessionFilter {
                therapist_id: Some(therapist_id),
                date,
                ..SessionFilter::default()
            })
            .await
            .map_err(normalize_store_error)
    }

    /// Apply an admin transition under the session's version precondition.
    /// A concurrent write forces a re-read, so the transition is always
    /// checked against the stored status.
    pub async fn update_session_status(&self, session_id: &str, status: SessionStatus) -> ServiceResult<Session> {
        if status == SessionStatus::Cancelled {
            return Err(ServiceError::validation("Use the cancellation endpoint to cancel a session"));
        }

        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut session = self.get_session(session_id).await?;
            debug!("Transitioning session {} from {} to {}", session.id, session.status, status);

            if !allowed_transitions(session.status).contains(&status) {
                warn!("Invalid status transition attempted: {} -> {}", session.status, status);
                return Err(ServiceError::validation(format!(
                    "Cannot move session from {} to {}",
                    session.status, status
                )));
            }

            session.status = status;
            session.updated_at = Utc::now();

            let mut tx = Transaction::new();
            tx.put_session(session.clone());

            match self.store.commit(tx).await {
                Ok(()) => {
                    session.version += 1;
                    info!("Session {} is now {}", session.id, status);
                    return Ok(session);
                }
                Err(StoreError::Conflict(msg)) if attempt <= self.max_retries => {
                    debug!("Status update of session {} conflicted, retrying: {}", session.id, msg);
                }
                Err(e) => return Err(normalize_store_error(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_transitions_are_allowed() {
        assert_eq!(allowed_transitions(SessionStatus::Pending), &[SessionStatus::Confirmed]);
        assert_eq!(allowed_transitions(SessionStatus::Confirmed), &[SessionStatus::Completed]);
        assert!(allowed_transitions(SessionStatus::Completed).is_empty());
        assert!(allowed_transitions(SessionStatus::Cancelled).is_empty());
    }
}
