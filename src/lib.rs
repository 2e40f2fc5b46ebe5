//! # nutrilog
//!
//! Per-day nutrition tracking. Each user's calendar day holds a list of
//! meals and a running nutrition total that is kept equal, nutrient by
//! nutrient, to the sum over those meals. Mutations go through aggregate
//! operations that preserve that sum exactly, and through a versioned store
//! that refuses stale writes instead of losing concurrent updates.
//!
//! [`days::DayService`] is the entry point. It runs against any
//! [`days::DayStore`]; a Postgres implementation and an in-memory one are
//! provided.

pub mod config;
pub mod days;
pub mod nutrition;

mod error;

pub use config::AppConfig;
pub use days::{
    DayRecord, DayService, DayStore, Food, Meal, MemoryDayStore, PgDayStore, StoredDay,
};
pub use error::{Error, Result};
pub use nutrition::{apply_meal_delta, Nutrient, NutrientKey, NutritionSummary, Sign};
