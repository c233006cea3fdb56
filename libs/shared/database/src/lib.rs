pub mod memory;
pub mod state;
pub mod store;
pub mod supabase;
pub mod supabase_store;

pub use memory::MemoryStore;
pub use state::AppState;
pub use store::{
    normalize_store_error, SchedulingStore, SessionFilter, StoreError, StoreResult, Transaction, Write,
};
pub use supabase_store::SupabaseStore;
