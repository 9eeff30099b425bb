/// Database layer for TaskTrack
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: Embedded migration runner
///
/// Row operations live on the model types in [`crate::models`].

pub mod migrations;
pub mod pool;
