use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::ClockTime;

// ==============================================================================
// THERAPISTS & CONSULTING HOURS
// ==============================================================================

/// Recurring weekly availability for one day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultingHour {
    /// 0 = Sunday ... 6 = Saturday
    pub day_of_week: u8,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Therapist {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub consulting_hours: Vec<ConsultingHour>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Therapist {
    pub fn new(name: impl Into<String>, email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email,
            consulting_hours: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The enabled consulting hour for a day of week, if any.
    pub fn hours_for_day(&self, day_of_week: u8) -> Option<&ConsultingHour> {
        self.consulting_hours
            .iter()
            .find(|hour| hour.day_of_week == day_of_week && hour.is_enabled)
    }
}

// ==============================================================================
// SCHEDULES & SLOTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub is_available: bool,
    #[serde(default)]
    pub is_customized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

impl TimeSlot {
    /// A bookable slot as produced by the generator.
    pub fn generated(start_time: ClockTime, end_time: ClockTime) -> Self {
        Self {
            start_time,
            end_time,
            is_available: true,
            is_customized: false,
            session_id: None,
        }
    }

    pub fn custom(start_time: ClockTime, end_time: ClockTime) -> Self {
        Self {
            is_customized: true,
            ..Self::generated(start_time, end_time)
        }
    }

    pub fn is_booked(&self) -> bool {
        !self.is_available && self.session_id.is_some()
    }

    pub fn overlaps(&self, start: ClockTime, end: ClockTime) -> bool {
        self.start_time < end && start < self.end_time
    }

    pub fn reserve(&mut self, session_id: Uuid) {
        self.is_available = false;
        self.session_id = Some(session_id);
    }

    pub fn release(&mut self) {
        self.is_available = true;
        self.session_id = None;
    }
}

/// Materialized slots of one therapist on one date. Unique on (therapist_id, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
    #[serde(default)]
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn new(therapist_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            therapist_id,
            date,
            slots: Vec::new(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn find_slot(&self, start_time: ClockTime) -> Option<&TimeSlot> {
        self.slots.iter().find(|slot| slot.start_time == start_time)
    }

    pub fn find_slot_mut(&mut self, start_time: ClockTime) -> Option<&mut TimeSlot> {
        self.slots.iter_mut().find(|slot| slot.start_time == start_time)
    }

    pub fn find_available_slot_mut(&mut self, start_time: ClockTime) -> Option<&mut TimeSlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.start_time == start_time && slot.is_available)
    }

    /// True if any slot other than the one starting at `exclude` overlaps the window.
    pub fn has_overlap(&self, start: ClockTime, end: ClockTime, exclude: Option<ClockTime>) -> bool {
        self.slots
            .iter()
            .filter(|slot| Some(slot.start_time) != exclude)
            .any(|slot| slot.overlaps(start, end))
    }

    pub fn sort_slots(&mut self) {
        self.slots.sort_by_key(|slot| slot.start_time);
    }

    pub fn retain_available(&mut self) {
        self.slots.retain(|slot| slot.is_available);
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Response shape for a single-date schedule query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

// ==============================================================================
// SESSIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Confirmed => write!(f, "confirmed"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub therapist_id: Uuid,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub status: SessionStatus,
    /// Bumped by the store on every write; 0 until first persisted.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn pending(user_id: Uuid, therapist_id: Uuid, date: NaiveDate, slot: &TimeSlot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            therapist_id,
            date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: SessionStatus::Pending,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != SessionStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u16, m: u16) -> ClockTime {
        ClockTime::from_hm(h, m).unwrap()
    }

    #[test]
    fn slot_round_trips_in_camel_case() {
        let slot = TimeSlot::generated(t(9, 0), t(10, 0));
        let value = serde_json::to_value(&slot).unwrap();
        assert_eq!(value["startTime"], "09:00 AM");
        assert_eq!(value["isAvailable"], true);
        assert!(value.get("sessionId").is_none());
    }

    #[test]
    fn reserve_and_release_keep_flags_consistent() {
        let mut slot = TimeSlot::generated(t(9, 0), t(10, 0));
        let id = Uuid::new_v4();
        slot.reserve(id);
        assert!(slot.is_booked());
        slot.release();
        assert!(slot.is_available);
        assert_eq!(slot.session_id, None);
    }

    #[test]
    fn overlap_is_half_open() {
        let slot = TimeSlot::generated(t(9, 0), t(10, 0));
        assert!(!slot.overlaps(t(10, 0), t(11, 0)));
        assert!(slot.overlaps(t(9, 30), t(10, 30)));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SessionStatus::Cancelled).unwrap(), "\"cancelled\"");
    }
}
