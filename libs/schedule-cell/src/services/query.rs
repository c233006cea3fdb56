use std::sync::Arc;

use tracing::debug;

use shared_database::{normalize_store_error, AppState, SchedulingStore};
use shared_models::{DaySchedule, Schedule, ServiceError, ServiceResult};
use shared_utils::ids::{parse_date, parse_id};

pub struct ScheduleQueryService {
    store: Arc<dyn SchedulingStore>,
}

impl ScheduleQueryService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(Arc::clone(&state.store))
    }

    pub fn with_store(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Slots for one date. A date without a stored schedule has no slots.
    pub async fn get_schedule_for_date(&self, therapist_id: &str, date: &str) -> ServiceResult<DaySchedule> {
        let therapist_id = parse_id("therapist", therapist_id)?;
        let date = parse_date(date)?;

        let schedule = self
            .store
            .get_schedule(therapist_id, date)
            .await
            .map_err(normalize_store_error)?;

        Ok(DaySchedule {
            date,
            slots: schedule.map(|s| s.slots).unwrap_or_default(),
        })
    }

    /// Stored schedules between `from` and `to` inclusive, ordered by date.
    pub async fn get_schedules_in_range(
        &self,
        therapist_id: &str,
        from: &str,
        to: &str,
        available_only: bool,
    ) -> ServiceResult<Vec<Schedule>> {
        let therapist_id = parse_id("therapist", therapist_id)?;
        let from = parse_date(from)?;
        let to = parse_date(to)?;

        if from > to {
            return Err(ServiceError::validation(format!(
                "Range start {} is after range end {}",
                from, to
            )));
        }

        debug!("Listing schedules for therapist {} from {} to {}", therapist_id, from, to);

        let mut schedules = self
            .store
            .list_schedules(therapist_id, from, to)
            .await
            .map_err(normalize_store_error)?;

        if available_only {
            for schedule in schedules.iter_mut() {
                schedule.retain_available();
            }
        }

        Ok(schedules)
    }
}
