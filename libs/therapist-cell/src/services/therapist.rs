use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{normalize_store_error, AppState, SchedulingStore, Transaction};
use shared_models::{ConsultingHour, ServiceError, ServiceResult, Therapist};
use shared_utils::ids::parse_id;

pub struct TherapistService {
    store: Arc<dyn SchedulingStore>,
}

impl TherapistService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(Arc::clone(&state.store))
    }

    pub fn with_store(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    pub async fn create_therapist(&self, name: &str, email: Option<String>) -> ServiceResult<Therapist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Therapist name is required"));
        }

        let therapist = Therapist::new(name, email);

        let mut tx = Transaction::new();
        tx.put_therapist(therapist.clone());
        self.store.commit(tx).await.map_err(normalize_store_error)?;

        info!("Therapist {} created", therapist.id);
        Ok(therapist)
    }

    pub async fn get_therapist(&self, therapist_id: &str) -> ServiceResult<Therapist> {
        let id = parse_id("therapist", therapist_id)?;
        self.load(id).await
    }

    pub async fn list_therapists(&self) -> ServiceResult<Vec<Therapist>> {
        self.store.list_therapists().await.map_err(normalize_store_error)
    }

    pub async fn get_consulting_hours(&self, therapist_id: &str) -> ServiceResult<Vec<ConsultingHour>> {
        Ok(self.get_therapist(therapist_id).await?.consulting_hours)
    }

    /// Replace the weekly template. Entries are stored ordered by day of week.
    pub async fn set_consulting_hours(
        &self,
        therapist_id: &str,
        mut hours: Vec<ConsultingHour>,
    ) -> ServiceResult<Therapist> {
        let id = parse_id("therapist", therapist_id)?;
        debug!("Setting {} consulting hours for therapist {}", hours.len(), id);

        validate_consulting_hours(&hours)?;
        hours.sort_by_key(|hour| hour.day_of_week);

        let mut therapist = self.load(id).await?;
        therapist.consulting_hours = hours;
        therapist.updated_at = Utc::now();

        let mut tx = Transaction::new();
        tx.put_therapist(therapist.clone());
        self.store.commit(tx).await.map_err(normalize_store_error)?;

        info!("Consulting hours updated for therapist {}", id);
        Ok(therapist)
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Therapist> {
        self.store
            .get_therapist(id)
            .await
            .map_err(normalize_store_error)?
            .ok_or_else(|| ServiceError::not_found(format!("Therapist {} not found", id)))
    }
}

pub fn validate_consulting_hours(hours: &[ConsultingHour]) -> ServiceResult<()> {
    let mut seen = HashSet::new();

    for hour in hours {
        if hour.day_of_week > 6 {
            return Err(ServiceError::validation(format!(
                "Day of week must be between 0 (Sunday) and 6 (Saturday), got {}",
                hour.day_of_week
            )));
        }

        if !seen.insert(hour.day_of_week) {
            warn!("Duplicate consulting hours for day {}", hour.day_of_week);
            return Err(ServiceError::validation(format!(
                "Consulting hours for day {} given more than once",
                hour.day_of_week
            )));
        }

        if hour.is_enabled && hour.start_time >= hour.end_time {
            return Err(ServiceError::validation(format!(
                "Start time {} must be before end time {}",
                hour.start_time, hour.end_time
            )));
        }
    }

    Ok(())
}
