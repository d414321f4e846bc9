use super::*;

use fieldvisit_reconcile::build_customer_list;

const LIMIT: Duration = Duration::from_millis(200);

/// In-memory source with optional failing or stalled streams.
#[derive(Default)]
struct MemorySource {
    snapshot: Snapshot,
    failing: Option<StreamKind>,
    stalled: Option<StreamKind>,
}

impl MemorySource {
    async fn serve<T: Clone + Sync>(
        &self,
        stream: StreamKind,
        rows: &[T],
    ) -> Result<Vec<T>, DbError> {
        if self.failing == Some(stream) {
            return Err(DbError::Sqlx(sqlx::Error::RowNotFound));
        }
        if self.stalled == Some(stream) {
            std::future::pending::<()>().await;
        }
        Ok(rows.to_vec())
    }
}

impl FieldDataSource for MemorySource {
    async fn customers(&self, _owner: Uuid) -> Result<Vec<RawCustomerRecord>, DbError> {
        self.serve(StreamKind::Customers, &self.snapshot.customers)
            .await
    }

    async fn schedule_locations(&self, _owner: Uuid) -> Result<Vec<RawLocation>, DbError> {
        self.serve(
            StreamKind::ScheduleLocations,
            &self.snapshot.schedule_locations,
        )
        .await
    }

    async fn locations(&self) -> Result<Vec<RawLocation>, DbError> {
        self.serve(StreamKind::Locations, &self.snapshot.locations)
            .await
    }

    async fn visits(&self, _owner: Uuid) -> Result<Vec<VisitEvent>, DbError> {
        self.serve(StreamKind::Visits, &self.snapshot.visits).await
    }

    async fn reports(&self, _owner: Uuid) -> Result<Vec<ReportEvent>, DbError> {
        self.serve(StreamKind::Reports, &self.snapshot.reports).await
    }

    async fn notes(&self, _owner: Uuid) -> Result<Vec<NoteEvent>, DbError> {
        self.serve(StreamKind::Notes, &self.snapshot.notes).await
    }

    async fn locations_by_name(&self, substring: &str) -> Result<Vec<RawLocation>, DbError> {
        let needle = substring.trim().to_lowercase();
        Ok(self
            .snapshot
            .locations
            .iter()
            .filter(|l| {
                l.name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), DbError> {
        Ok(())
    }
}

fn sample() -> Snapshot {
    Snapshot {
        customers: vec![RawCustomerRecord {
            id: Uuid::new_v4(),
            name: Some("Corner Shop".to_string()),
            phone: Some("111".to_string()),
            ..RawCustomerRecord::default()
        }],
        locations: vec![RawLocation {
            id: Uuid::new_v4(),
            name: Some("Central Pharmacy".to_string()),
            ..RawLocation::default()
        }],
        visits: vec![VisitEvent {
            id: Uuid::new_v4(),
            store_name: Some("corner shop".to_string()),
            phone: Some("222".to_string()),
            ..VisitEvent::default()
        }],
        ..Snapshot::default()
    }
}

#[tokio::test]
async fn strict_fetch_returns_every_stream() {
    let source = MemorySource {
        snapshot: sample(),
        ..MemorySource::default()
    };

    let snapshot = fetch_snapshot(&source, Uuid::new_v4(), LIMIT)
        .await
        .expect("fetch should succeed");

    assert_eq!(snapshot, source.snapshot);
}

#[tokio::test]
async fn strict_fetch_names_the_failed_stream() {
    let source = MemorySource {
        snapshot: sample(),
        failing: Some(StreamKind::Visits),
        ..MemorySource::default()
    };

    let err = fetch_snapshot(&source, Uuid::new_v4(), LIMIT)
        .await
        .expect_err("visits stream fails");

    assert_eq!(err.stream(), StreamKind::Visits);
    assert!(matches!(err, FetchError::Db { .. }));
    assert!(err.to_string().starts_with("fetching visits failed"));
}

#[tokio::test]
async fn stalled_stream_times_out() {
    let source = MemorySource {
        snapshot: sample(),
        stalled: Some(StreamKind::Notes),
        ..MemorySource::default()
    };

    let err = fetch_snapshot(&source, Uuid::new_v4(), Duration::from_millis(20))
        .await
        .expect_err("notes stream stalls");

    assert!(matches!(
        err,
        FetchError::TimedOut {
            stream: StreamKind::Notes,
            ..
        }
    ));
}

#[tokio::test]
async fn degraded_fetch_reports_substituted_streams() {
    let source = MemorySource {
        snapshot: sample(),
        failing: Some(StreamKind::Customers),
        ..MemorySource::default()
    };

    let degraded = fetch_snapshot_allow_degraded(&source, Uuid::new_v4(), LIMIT).await;

    assert!(!degraded.is_complete());
    assert_eq!(degraded.missing, vec![StreamKind::Customers]);
    assert!(degraded.snapshot.customers.is_empty());
    assert_eq!(degraded.snapshot.visits.len(), 1);

    // Without the customer row the visit seeds the identity instead.
    let set = build_customer_list(&degraded.snapshot);
    let shop = set.get("corner shop").expect("visit-seeded identity");
    assert_eq!(shop.phone.as_deref(), Some("222"));
    assert_eq!(shop.id.as_str(), "adhoc-corner%20shop");
}

#[tokio::test]
async fn degraded_fetch_treats_timeouts_as_missing() {
    let source = MemorySource {
        snapshot: sample(),
        stalled: Some(StreamKind::Locations),
        ..MemorySource::default()
    };

    let degraded =
        fetch_snapshot_allow_degraded(&source, Uuid::new_v4(), Duration::from_millis(20)).await;

    assert_eq!(degraded.missing, vec![StreamKind::Locations]);
    assert_eq!(degraded.snapshot.customers.len(), 1);
}

#[tokio::test]
async fn degraded_fetch_without_failures_is_complete() {
    let source = MemorySource {
        snapshot: sample(),
        ..MemorySource::default()
    };

    let degraded = fetch_snapshot_allow_degraded(&source, Uuid::new_v4(), LIMIT).await;

    assert!(degraded.is_complete());
    assert_eq!(degraded.snapshot, source.snapshot);
}

#[tokio::test]
async fn location_search_is_case_insensitive() {
    let source = MemorySource {
        snapshot: sample(),
        ..MemorySource::default()
    };

    let hits = source.locations_by_name("PHARM").await.unwrap();

    assert_eq!(hits.len(), 1);
    assert!(source.locations_by_name("bakery").await.unwrap().is_empty());
}
