//! Day records and the operations that maintain them.

pub mod aggregate;
pub mod memory;
pub mod model;
pub mod repo;
pub mod service;

pub use aggregate::order_meals;
pub use memory::MemoryDayStore;
pub use model::{DayRecord, Food, Meal};
pub use repo::{DayStore, PgDayStore, StoredDay};
pub use service::{DayService, DEFAULT_WRITE_RETRIES};
