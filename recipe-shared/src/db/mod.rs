/// Database layer for the recipe server
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool, health check and startup wait
/// - `migrations`: Embedded sqlx migration runner
///
/// Models live in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
