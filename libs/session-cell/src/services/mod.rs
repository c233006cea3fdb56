pub mod booking;
pub mod cancellation;
pub mod lifecycle;

pub use booking::BookingService;
pub use cancellation::CancellationService;
pub use lifecycle::SessionLifecycleService;
