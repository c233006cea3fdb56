use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::{RegenerateMode, SchedulingConfig};
use shared_database::{normalize_store_error, AppState, SchedulingStore, StoreError, Transaction};
use shared_models::{ConsultingHour, Schedule, ServiceError, ServiceResult, Therapist, TimeSlot};
use shared_utils::ids::parse_id;

use crate::models::{GenerationReport, OrphanedSession};

const MAX_GENERATION_DAYS: u32 = 366;

/// Expand one consulting-hour window into fixed-length slots.
///
/// The pointer advances one slot length at a time. A step that would run past
/// lunch start while the pointer is still before lunch end jumps the pointer
/// to lunch end instead of emitting a slot. Slots never extend past the
/// window's end.
pub fn generate_day_slots(hour: &ConsultingHour, config: &SchedulingConfig) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    let mut current = hour.start_time;

    while let Some(slot_end) = current.add_minutes(config.slot_duration_minutes) {
        if slot_end > hour.end_time {
            break;
        }

        if slot_end > config.lunch_start && current < config.lunch_end {
            current = config.lunch_end;
            continue;
        }

        slots.push(TimeSlot::generated(current, slot_end));
        current = slot_end;
    }

    slots
}

/// Slots for a concrete date, or `None` when the therapist does not work that day.
pub fn plan_for_date(therapist: &Therapist, date: NaiveDate, config: &SchedulingConfig) -> Option<Vec<TimeSlot>> {
    let day_of_week = date.weekday().num_days_from_sunday() as u8;
    therapist
        .hours_for_day(day_of_week)
        .map(|hour| generate_day_slots(hour, config))
}

/// Keep every customized or booked slot of `existing`, then add the generated
/// slots that do not collide with a kept one.
pub fn merge_preserving(existing: &[TimeSlot], generated: Vec<TimeSlot>) -> (Vec<TimeSlot>, usize) {
    let mut merged: Vec<TimeSlot> = existing
        .iter()
        .filter(|slot| slot.is_customized || slot.session_id.is_some())
        .cloned()
        .collect();
    let preserved = merged.len();

    let fresh: Vec<TimeSlot> = generated
        .into_iter()
        .filter(|slot| !merged.iter().any(|kept| kept.overlaps(slot.start_time, slot.end_time)))
        .collect();

    merged.extend(fresh);
    merged.sort_by_key(|slot| slot.start_time);
    (merged, preserved)
}

struct DayOutcome {
    slots_generated: usize,
    preserved_slots: usize,
    orphaned: Vec<OrphanedSession>,
}

pub struct SlotGeneratorService {
    store: Arc<dyn SchedulingStore>,
    config: SchedulingConfig,
}

impl SlotGeneratorService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(Arc::clone(&state.store), state.config.scheduling.clone())
    }

    pub fn with_store(store: Arc<dyn SchedulingStore>, config: SchedulingConfig) -> Self {
        Self { store, config }
    }

    /// Materialize schedules for `days` dates starting at `start_date`.
    pub async fn generate_schedules(
        &self,
        therapist_id: &str,
        start_date: NaiveDate,
        days: Option<u32>,
        mode: Option<RegenerateMode>,
    ) -> ServiceResult<GenerationReport> {
        let therapist_id = parse_id("therapist", therapist_id)?;
        let days = days.unwrap_or(self.config.default_generation_days);
        let mode = mode.unwrap_or(self.config.regenerate_mode);

        if days == 0 || days > MAX_GENERATION_DAYS {
            return Err(ServiceError::validation(format!(
                "Days must be between 1 and {}, got {}",
                MAX_GENERATION_DAYS, days
            )));
        }

        if start_date.checked_add_signed(Duration::days(days as i64 - 1)).is_none() {
            return Err(ServiceError::validation(format!(
                "Generating {} days from {} runs past the last supported date",
                days, start_date
            )));
        }

        let therapist = self
            .store
            .get_therapist(therapist_id)
            .await
            .map_err(normalize_store_error)?
            .ok_or_else(|| ServiceError::not_found(format!("Therapist {} not found", therapist_id)))?;

        debug!(
            "Generating {} days of slots for therapist {} from {} ({:?})",
            days, therapist_id, start_date, mode
        );

        let mut report = GenerationReport {
            therapist_id,
            start_date,
            days,
            mode,
            dates_written: Vec::new(),
            slots_generated: 0,
            preserved_slots: 0,
            orphaned_sessions: Vec::new(),
        };

        for date in start_date.iter_days().take(days as usize) {
            let Some(generated) = plan_for_date(&therapist, date, &self.config) else {
                continue;
            };

            let outcome = self.write_day(therapist_id, date, generated, mode).await?;

            report.dates_written.push(date);
            report.slots_generated += outcome.slots_generated;
            report.preserved_slots += outcome.preserved_slots;
            report.orphaned_sessions.extend(outcome.orphaned);
        }

        if !report.orphaned_sessions.is_empty() {
            warn!(
                "Regeneration for therapist {} dropped {} booked slots with live sessions",
                therapist_id,
                report.orphaned_sessions.len()
            );
        }

        info!(
            "Generated {} slots over {} dates for therapist {}",
            report.slots_generated,
            report.dates_written.len(),
            therapist_id
        );

        Ok(report)
    }

    async fn write_day(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
        generated: Vec<TimeSlot>,
        mode: RegenerateMode,
    ) -> ServiceResult<DayOutcome> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let existing = self
                .store
                .get_schedule(therapist_id, date)
                .await
                .map_err(normalize_store_error)?;

            let mut schedule = existing.clone().unwrap_or_else(|| Schedule::new(therapist_id, date));
            let previous = existing.map(|s| s.slots).unwrap_or_default();

            let outcome = match mode {
                RegenerateMode::Preserve => {
                    let (slots, preserved) = merge_preserving(&previous, generated.clone());
                    schedule.slots = slots;
                    DayOutcome {
                        slots_generated: schedule.slots.len() - preserved,
                        preserved_slots: preserved,
                        orphaned: Vec::new(),
                    }
                }
                RegenerateMode::Replace => {
                    schedule.slots = generated.clone();
                    DayOutcome {
                        slots_generated: schedule.slots.len(),
                        preserved_slots: 0,
                        orphaned: self.live_sessions_in(&previous, date).await?,
                    }
                }
            };
            schedule.touch();

            let mut tx = Transaction::new();
            tx.put_schedule(schedule);

            match self.store.commit(tx).await {
                Ok(()) => return Ok(outcome),
                Err(StoreError::Conflict(msg)) if attempt <= self.config.booking_max_retries => {
                    debug!("Schedule {} for {} changed during generation, retrying: {}", date, therapist_id, msg);
                }
                Err(e) => return Err(normalize_store_error(e)),
            }
        }
    }

    async fn live_sessions_in(&self, slots: &[TimeSlot], date: NaiveDate) -> ServiceResult<Vec<OrphanedSession>> {
        let mut orphaned = Vec::new();

        for slot in slots {
            let Some(session_id) = slot.session_id else {
                continue;
            };

            let session = self.store.get_session(session_id).await.map_err(normalize_store_error)?;
            if session.is_some_and(|s| s.is_active()) {
                orphaned.push(OrphanedSession {
                    session_id,
                    date,
                    start_time: slot.start_time,
                });
            }
        }

        Ok(orphaned)
    }
}
