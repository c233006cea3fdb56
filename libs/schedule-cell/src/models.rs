use serde::{Deserialize, Serialize};

use shared_models::ClockTime;

#[derive(Debug, Clone, Deserialize)]
pub struct DayScheduleQuery {
    pub date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRangeQuery {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSlotRequest {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

/// Changes to apply to the slot currently starting at `start_time`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPatch {
    pub start_time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSlotRequest {
    pub start_time: ClockTime,
    #[serde(default)]
    pub changes: SlotPatch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteSlotQuery {
    pub start_time: ClockTime,
}
