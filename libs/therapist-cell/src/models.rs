use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_config::RegenerateMode;
use shared_models::{ClockTime, ConsultingHour};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTherapistRequest {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetConsultingHoursRequest {
    pub consulting_hours: Vec<ConsultingHour>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSchedulesRequest {
    pub start_date: NaiveDate,
    pub days: Option<u32>,
    pub mode: Option<RegenerateMode>,
}

/// A booked slot that a `replace` regeneration removed while its session is
/// still live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedSession {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub start_time: ClockTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub therapist_id: Uuid,
    pub start_date: NaiveDate,
    pub days: u32,
    pub mode: RegenerateMode,
    pub dates_written: Vec<NaiveDate>,
    pub slots_generated: usize,
    pub preserved_slots: usize,
    pub orphaned_sessions: Vec<OrphanedSession>,
}
