//! Repository layer: SQLite persistence behind small trait contracts.
//!
//! # Responsibility
//! - Define data access contracts for entities, the activity feed,
//!   dashboard queries and integration settings.
//! - Isolate SQL and row mapping from service orchestration.
//!
//! # Invariants
//! - Write paths validate models before persistence.
//! - Repositories borrow a migrated connection and reject any other
//!   (`try_new`).
//! - Semantic errors (`NotFound`, `Conflict`) are distinct from storage
//!   errors.

pub mod activity_repo;
pub mod connection_repo;
pub mod entity_repo;
pub mod report_repo;
mod rows;
mod schema_check;
pub mod table;
