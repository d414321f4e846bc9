//! Postgres access for the field streams.
//!
//! [`PgSource`] is the production [`FieldDataSource`]; the reconciliation
//! engine only ever sees the [`fieldvisit_core::Snapshot`] it produces.

pub mod pool;
pub mod source;
pub mod streams;

use thiserror::Error;

pub use pool::{connect_pool, ping, run_migrations, PoolConfig};
pub use source::{
    fetch_snapshot, fetch_snapshot_allow_degraded, DegradedSnapshot, FetchError, FieldDataSource,
    PgSource,
};
pub use streams::{
    like_pattern, list_customers_by_owner, list_locations, list_notes_by_visitor,
    list_reports_by_visitor, list_schedule_locations_by_visitor, list_visits_by_user,
    search_locations_by_name, CustomerRow, LocationRow, NoteRow, ReportRow, VisitRow,
    LOCATION_SEARCH_LIMIT,
};

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}
