use serde::{Deserialize, Serialize};

use shared_models::SessionStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSessionRequest {
    pub therapist_id: String,
    pub date: String,
    pub start_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSessionStatusRequest {
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TherapistSessionsQuery {
    pub date: Option<String>,
}
