//! Core data layer for ProjectForge.
//! This crate owns the schema, entity invariants, delete guards, the
//! activity feed and dashboard aggregations.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::{Entity, EntityKind, EntityModel, Record};
pub use model::task::TaskStatus;
pub use model::validation::ValidationError;
pub use model::EntityId;
pub use repo::activity_repo::{ActivityLogger, SqliteActivityLog};
pub use repo::connection_repo::{ConnectionSettingsStore, SqliteConnectionStore};
pub use repo::entity_repo::{
    EntityRepository, ErrorCategory, LookupItem, RepoError, RepoResult, SqliteEntityRepository,
};
pub use repo::report_repo::{ReportRepository, SqliteReportRepository, TaskFilter};
pub use service::entity_service::EntityService;
pub use service::report_service::ReportService;

pub use rusqlite::Connection;

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
