use thiserror::Error;

/// Errors surfaced by the nutrilog core.
///
/// The library never writes responses or retries on its own (beyond the
/// bounded conflict retry inside the day service); an HTTP layer sitting on
/// top is expected to map `NotFound` to 404, `Validation` to 400, `Conflict`
/// to 409 and everything else to 500.
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced day or meal does not exist.
    #[error("record not found")]
    NotFound,

    /// Malformed input (negative serving size, unknown nutrient key, ...).
    #[error("invalid input: {0}")]
    Validation(String),

    /// A versioned write lost a race, or an insert hit an existing
    /// (userId, date) day.
    #[error("concurrent update conflict")]
    Conflict,

    /// Database error from the Postgres store, including day-document
    /// decode failures surfaced by the driver.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failure.
    #[error("migration error: {0}")]
    Migration(String),

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
