pub mod generator;
pub mod therapist;

pub use generator::SlotGeneratorService;
pub use therapist::TherapistService;
