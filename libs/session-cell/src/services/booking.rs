use std::sync::Arc;

use tracing::{debug, info, warn};

use shared_database::{normalize_store_error, AppState, SchedulingStore, StoreError, Transaction};
use shared_models::{Session, ServiceError, ServiceResult};
use shared_utils::ids::{parse_date, parse_id, parse_time};

pub const SLOT_UNAVAILABLE: &str = "slot not available for booking";

pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
    max_retries: u32,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(Arc::clone(&state.store), state.config.scheduling.booking_max_retries)
    }

    pub fn with_store(store: Arc<dyn SchedulingStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    /// Reserve the slot starting at `start_time` and create a pending session
    /// for it in one transaction. Of two concurrent bookings of the same slot
    /// exactly one commits; the other observes the slot as taken.
    pub async fn create_session(
        &self,
        user_id: &str,
        therapist_id: &str,
        date: &str,
        start_time: &str,
    ) -> ServiceResult<Session> {
        let user_id = parse_id("user", user_id)?;
        let therapist_id = parse_id("therapist", therapist_id)?;
        let date = parse_date(date)?;
        let start_time = parse_time(start_time)?;

        self.store
            .get_therapist(therapist_id)
            .await
            .map_err(normalize_store_error)?
            .ok_or_else(|| ServiceError::not_found(format!("Therapist {} not found", therapist_id)))?;

        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                "Booking attempt {} for therapist {} on {} at {}",
                attempt, therapist_id, date, start_time
            );

            let mut schedule = self
                .store
                .get_schedule(therapist_id, date)
                .await
                .map_err(normalize_store_error)?
                .ok_or_else(|| ServiceError::validation(SLOT_UNAVAILABLE))?;

            let slot = schedule
                .find_available_slot_mut(start_time)
                .ok_or_else(|| ServiceError::validation(SLOT_UNAVAILABLE))?;

            let mut session = Session::pending(user_id, therapist_id, date, slot);
            slot.reserve(session.id);
            schedule.touch();

            let mut tx = Transaction::new();
            tx.put_session(session.clone()).put_schedule(schedule);

            match self.store.commit(tx).await {
                Ok(()) => {
                    session.version += 1;
                    info!(
                        "Session {} booked for user {} with therapist {} on {} at {}",
                        session.id, user_id, therapist_id, date, start_time
                    );
                    return Ok(session);
                }
                Err(StoreError::Conflict(msg)) if attempt <= self.max_retries => {
                    debug!("Booking conflict on {} at {}, retrying: {}", date, start_time, msg);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(
                        "Booking for therapist {} on {} at {} lost after {} attempts",
                        therapist_id, date, start_time, attempt
                    );
                    return Err(ServiceError::validation(SLOT_UNAVAILABLE));
                }
                Err(e) => return Err(normalize_store_error(e)),
            }
        }
    }
}
