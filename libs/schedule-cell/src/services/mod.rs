pub mod custom_slots;
pub mod query;

pub use custom_slots::CustomSlotService;
pub use query::ScheduleQueryService;
