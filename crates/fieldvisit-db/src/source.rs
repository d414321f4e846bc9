//! The fetch collaborator the engine is fed from, and the concurrent
//! snapshot fetch built on top of it.

use std::future::Future;
use std::time::Duration;

use fieldvisit_core::{
    NoteEvent, RawCustomerRecord, RawLocation, ReportEvent, Snapshot, StreamKind, VisitEvent,
};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::streams;
use crate::DbError;

/// Read access to every raw stream for one owner.
///
/// Implementations return plain snapshots; they do not reconcile anything.
pub trait FieldDataSource: Send + Sync {
    fn customers(
        &self,
        owner: Uuid,
    ) -> impl Future<Output = Result<Vec<RawCustomerRecord>, DbError>> + Send;

    fn schedule_locations(
        &self,
        owner: Uuid,
    ) -> impl Future<Output = Result<Vec<RawLocation>, DbError>> + Send;

    fn locations(&self) -> impl Future<Output = Result<Vec<RawLocation>, DbError>> + Send;

    fn visits(&self, owner: Uuid) -> impl Future<Output = Result<Vec<VisitEvent>, DbError>> + Send;

    fn reports(
        &self,
        owner: Uuid,
    ) -> impl Future<Output = Result<Vec<ReportEvent>, DbError>> + Send;

    fn notes(&self, owner: Uuid) -> impl Future<Output = Result<Vec<NoteEvent>, DbError>> + Send;

    fn locations_by_name(
        &self,
        substring: &str,
    ) -> impl Future<Output = Result<Vec<RawLocation>, DbError>> + Send;

    /// Cheap liveness probe of the backing store.
    fn health_check(&self) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// [`FieldDataSource`] backed by the Postgres pool.
#[derive(Debug, Clone)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_records<R, T: From<R>>(rows: Vec<R>) -> Vec<T> {
    rows.into_iter().map(T::from).collect()
}

impl FieldDataSource for PgSource {
    async fn customers(&self, owner: Uuid) -> Result<Vec<RawCustomerRecord>, DbError> {
        streams::list_customers_by_owner(&self.pool, owner)
            .await
            .map(into_records)
    }

    async fn schedule_locations(&self, owner: Uuid) -> Result<Vec<RawLocation>, DbError> {
        streams::list_schedule_locations_by_visitor(&self.pool, owner)
            .await
            .map(into_records)
    }

    async fn locations(&self) -> Result<Vec<RawLocation>, DbError> {
        streams::list_locations(&self.pool).await.map(into_records)
    }

    async fn visits(&self, owner: Uuid) -> Result<Vec<VisitEvent>, DbError> {
        streams::list_visits_by_user(&self.pool, owner)
            .await
            .map(into_records)
    }

    async fn reports(&self, owner: Uuid) -> Result<Vec<ReportEvent>, DbError> {
        streams::list_reports_by_visitor(&self.pool, owner)
            .await
            .map(into_records)
    }

    async fn notes(&self, owner: Uuid) -> Result<Vec<NoteEvent>, DbError> {
        streams::list_notes_by_visitor(&self.pool, owner)
            .await
            .map(into_records)
    }

    async fn locations_by_name(&self, substring: &str) -> Result<Vec<RawLocation>, DbError> {
        streams::search_locations_by_name(&self.pool, substring)
            .await
            .map(into_records)
    }

    async fn health_check(&self) -> Result<(), DbError> {
        crate::ping(&self.pool).await
    }
}

/// One stream of a snapshot could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetching {stream} failed: {source}")]
    Db {
        stream: StreamKind,
        #[source]
        source: DbError,
    },
    #[error("fetching {stream} timed out after {after:?}")]
    TimedOut { stream: StreamKind, after: Duration },
}

impl FetchError {
    #[must_use]
    pub fn stream(&self) -> StreamKind {
        match self {
            FetchError::Db { stream, .. } | FetchError::TimedOut { stream, .. } => *stream,
        }
    }
}

async fn bounded<T>(
    stream: StreamKind,
    limit: Duration,
    fetch: impl Future<Output = Result<Vec<T>, DbError>>,
) -> Result<Vec<T>, FetchError> {
    match tokio::time::timeout(limit, fetch).await {
        Ok(Ok(rows)) => Ok(rows),
        Ok(Err(source)) => Err(FetchError::Db { stream, source }),
        Err(_) => Err(FetchError::TimedOut {
            stream,
            after: limit,
        }),
    }
}

/// Fetch every stream for `owner` concurrently and return them as one
/// snapshot.
///
/// Each stream is bounded by `limit`. All-or-nothing: the first stream that
/// fails or times out fails the whole fetch, so the engine never resolves
/// from a partial snapshot.
///
/// # Errors
///
/// Returns [`FetchError`] naming the first stream that failed.
pub async fn fetch_snapshot<S: FieldDataSource>(
    source: &S,
    owner: Uuid,
    limit: Duration,
) -> Result<Snapshot, FetchError> {
    let (customers, schedule_locations, locations, visits, reports, notes) = tokio::try_join!(
        bounded(StreamKind::Customers, limit, source.customers(owner)),
        bounded(
            StreamKind::ScheduleLocations,
            limit,
            source.schedule_locations(owner)
        ),
        bounded(StreamKind::Locations, limit, source.locations()),
        bounded(StreamKind::Visits, limit, source.visits(owner)),
        bounded(StreamKind::Reports, limit, source.reports(owner)),
        bounded(StreamKind::Notes, limit, source.notes(owner)),
    )?;

    let snapshot = Snapshot {
        customers,
        schedule_locations,
        locations,
        visits,
        reports,
        notes,
    };
    tracing::debug!(
        %owner,
        records = snapshot.record_count(),
        "fetched snapshot"
    );
    Ok(snapshot)
}

/// A snapshot in which some streams were replaced by empty ones.
#[derive(Debug, Clone, Default)]
pub struct DegradedSnapshot {
    pub snapshot: Snapshot,
    /// Streams that failed and were substituted, in fetch order.
    pub missing: Vec<StreamKind>,
}

impl DegradedSnapshot {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

fn or_empty<T>(result: Result<Vec<T>, FetchError>, missing: &mut Vec<StreamKind>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(stream = %err.stream(), error = %err, "substituting empty stream");
            missing.push(err.stream());
            Vec::new()
        }
    }
}

/// Like [`fetch_snapshot`], but a failed stream becomes an empty one.
///
/// An empty customers stream changes which record seeds each identity, so
/// callers must surface [`DegradedSnapshot::missing`] rather than treat the
/// result as complete.
pub async fn fetch_snapshot_allow_degraded<S: FieldDataSource>(
    source: &S,
    owner: Uuid,
    limit: Duration,
) -> DegradedSnapshot {
    let (customers, schedule_locations, locations, visits, reports, notes) = tokio::join!(
        bounded(StreamKind::Customers, limit, source.customers(owner)),
        bounded(
            StreamKind::ScheduleLocations,
            limit,
            source.schedule_locations(owner)
        ),
        bounded(StreamKind::Locations, limit, source.locations()),
        bounded(StreamKind::Visits, limit, source.visits(owner)),
        bounded(StreamKind::Reports, limit, source.reports(owner)),
        bounded(StreamKind::Notes, limit, source.notes(owner)),
    );

    let mut missing = Vec::new();
    let snapshot = Snapshot {
        customers: or_empty(customers, &mut missing),
        schedule_locations: or_empty(schedule_locations, &mut missing),
        locations: or_empty(locations, &mut missing),
        visits: or_empty(visits, &mut missing),
        reports: or_empty(reports, &mut missing),
        notes: or_empty(notes, &mut missing),
    };
    DegradedSnapshot { snapshot, missing }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
