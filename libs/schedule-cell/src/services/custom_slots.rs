use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_database::{normalize_store_error, AppState, SchedulingStore, StoreError, Transaction};
use shared_models::{ClockTime, Schedule, ServiceError, ServiceResult, TimeSlot};
use shared_utils::ids::{parse_date, parse_id};

use crate::models::SlotPatch;

/// Admin edits to the materialized slots of one date.
pub struct CustomSlotService {
    store: Arc<dyn SchedulingStore>,
    config: SchedulingConfig,
}

impl CustomSlotService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(Arc::clone(&state.store), state.config.scheduling.clone())
    }

    pub fn with_store(store: Arc<dyn SchedulingStore>, config: SchedulingConfig) -> Self {
        Self { store, config }
    }

    /// Add a customized, bookable slot. Creates the date's schedule when absent.
    pub async fn add_custom_slot(
        &self,
        therapist_id: &str,
        date: &str,
        start_time: ClockTime,
        end_time: ClockTime,
    ) -> ServiceResult<Schedule> {
        let therapist_id = parse_id("therapist", therapist_id)?;
        let date = parse_date(date)?;
        validate_window(start_time, end_time)?;

        self.store
            .get_therapist(therapist_id)
            .await
            .map_err(normalize_store_error)?
            .ok_or_else(|| ServiceError::not_found(format!("Therapist {} not found", therapist_id)))?;

        let schedule = self
            .modify(therapist_id, date, true, |schedule| {
                if schedule.has_overlap(start_time, end_time, None) {
                    return Err(ServiceError::validation(format!(
                        "Slot {} - {} overlaps an existing slot",
                        start_time, end_time
                    )));
                }
                schedule.slots.push(TimeSlot::custom(start_time, end_time));
                Ok(())
            })
            .await?;

        info!("Custom slot {} - {} added for therapist {} on {}", start_time, end_time, therapist_id, date);
        Ok(schedule)
    }

    /// Change the window or availability of the slot starting at `start_time`.
    /// Booked slots cannot be edited.
    pub async fn update_slot(
        &self,
        therapist_id: &str,
        date: &str,
        start_time: ClockTime,
        patch: SlotPatch,
    ) -> ServiceResult<Schedule> {
        let therapist_id = parse_id("therapist", therapist_id)?;
        let date = parse_date(date)?;

        let schedule = self
            .modify(therapist_id, date, false, |schedule| {
                let current = schedule
                    .find_slot(start_time)
                    .ok_or_else(|| ServiceError::not_found(format!("No slot starts at {} on {}", start_time, date)))?;

                if current.is_booked() {
                    return Err(ServiceError::validation("Booked slots cannot be edited"));
                }

                let new_start = patch.start_time.unwrap_or(current.start_time);
                let new_end = patch.end_time.unwrap_or(current.end_time);
                validate_window(new_start, new_end)?;

                if schedule.has_overlap(new_start, new_end, Some(start_time)) {
                    return Err(ServiceError::validation(format!(
                        "Slot {} - {} overlaps an existing slot",
                        new_start, new_end
                    )));
                }

                if let Some(slot) = schedule.find_slot_mut(start_time) {
                    slot.start_time = new_start;
                    slot.end_time = new_end;
                    if let Some(is_available) = patch.is_available {
                        slot.is_available = is_available;
                    }
                    slot.is_customized = true;
                }
                Ok(())
            })
            .await?;

        info!("Slot {} updated for therapist {} on {}", start_time, therapist_id, date);
        Ok(schedule)
    }

    /// Remove the slot starting at `start_time`. Booked slots cannot be removed.
    pub async fn delete_slot(&self, therapist_id: &str, date: &str, start_time: ClockTime) -> ServiceResult<Schedule> {
        let therapist_id = parse_id("therapist", therapist_id)?;
        let date = parse_date(date)?;

        let schedule = self
            .modify(therapist_id, date, false, |schedule| {
                let slot = schedule
                    .find_slot(start_time)
                    .ok_or_else(|| ServiceError::not_found(format!("No slot starts at {} on {}", start_time, date)))?;

                if slot.is_booked() {
                    return Err(ServiceError::validation("Booked slots cannot be deleted"));
                }

                schedule.slots.retain(|slot| slot.start_time != start_time);
                Ok(())
            })
            .await?;

        info!("Slot {} deleted for therapist {} on {}", start_time, therapist_id, date);
        Ok(schedule)
    }

    /// Read-modify-write of one schedule under its version precondition.
    async fn modify<F>(&self, therapist_id: Uuid, date: NaiveDate, create: bool, mut apply: F) -> ServiceResult<Schedule>
    where
        F: FnMut(&mut Schedule) -> ServiceResult<()> + Send,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut schedule = match self
                .store
                .get_schedule(therapist_id, date)
                .await
                .map_err(normalize_store_error)?
            {
                Some(schedule) => schedule,
                None if create => Schedule::new(therapist_id, date),
                None => {
                    return Err(ServiceError::not_found(format!(
                        "No schedule for therapist {} on {}",
                        therapist_id, date
                    )))
                }
            };

            apply(&mut schedule)?;
            schedule.sort_slots();
            schedule.touch();

            let mut tx = Transaction::new();
            tx.put_schedule(schedule.clone());

            match self.store.commit(tx).await {
                Ok(()) => {
                    schedule.version += 1;
                    return Ok(schedule);
                }
                Err(StoreError::Conflict(msg)) if attempt <= self.config.booking_max_retries => {
                    debug!("Schedule {} for {} changed concurrently, retrying: {}", date, therapist_id, msg);
                }
                Err(StoreError::Conflict(msg)) => {
                    warn!("Giving up on schedule {} for {} after {} attempts: {}", date, therapist_id, attempt, msg);
                    return Err(ServiceError::validation("Schedule was modified concurrently, try again"));
                }
                Err(e) => return Err(normalize_store_error(e)),
            }
        }
    }
}

fn validate_window(start_time: ClockTime, end_time: ClockTime) -> ServiceResult<()> {
    if start_time >= end_time {
        return Err(ServiceError::validation(format!(
            "Start time {} must be before end time {}",
            start_time, end_time
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn window_must_be_ordered() {
        assert!(validate_window(ClockTime::at(9, 0), ClockTime::at(10, 0)).is_ok());
        assert_matches!(
            validate_window(ClockTime::at(10, 0), ClockTime::at(10, 0)),
            Err(ServiceError::Validation(_))
        );
        assert_matches!(
            validate_window(ClockTime::at(11, 0), ClockTime::at(10, 0)),
            Err(ServiceError::Validation(_))
        );
    }
}
