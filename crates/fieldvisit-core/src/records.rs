//! Raw record shapes for the five streams a visitor's data arrives in.
//!
//! One struct per stream; nothing here merges across streams. The records are
//! snapshots of backend rows and may be incomplete: names can be missing and
//! timestamps can be absent when the backend value failed to parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An explicit customer row. Authoritative identity source when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCustomerRecord {
    pub id: Uuid,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub building_number: Option<String>,
    pub municipality_zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Store type recorded on the customer itself; used only when no event
    /// carries one.
    pub store_type: Option<String>,
    pub is_vip: bool,
    pub created_by: Uuid,
    pub created_at: Option<DateTime<Utc>>,
}

/// A planned location from the shared location catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    pub id: Uuid,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A free-form (ad-hoc) field visit keyed by a typed store name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub id: Uuid,
    pub store_name: Option<String>,
    pub store_type: Option<String>,
    pub has_order: bool,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub building_number: Option<String>,
    pub municipality_zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The alternate visit-log shape written by the older reporting flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportEvent {
    pub id: Uuid,
    /// Free text in legacy rows; only meaningful when it parses as a UUID.
    pub location_id: Option<String>,
    pub location_name: Option<String>,
    pub store_type: Option<String>,
    pub has_order: bool,
    pub occurred_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A visit recorded against a catalog location, usually from a schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub id: Uuid,
    pub location_id: Option<Uuid>,
    pub note: Option<String>,
    pub has_order: bool,
    pub occurred_at: Option<DateTime<Utc>>,
    pub schedule_id: Option<Uuid>,
}

/// Millisecond timestamp used for every recency comparison.
///
/// `None` sorts before any real timestamp, so records without one lose
/// every "most recent" contest.
#[must_use]
pub fn millis(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(|t| t.timestamp_millis())
}

impl VisitEvent {
    #[must_use]
    pub fn occurred_millis(&self) -> Option<i64> {
        millis(self.occurred_at)
    }
}

impl ReportEvent {
    #[must_use]
    pub fn occurred_millis(&self) -> Option<i64> {
        millis(self.occurred_at)
    }

    /// The report's location reference, when it is a well-formed UUID.
    #[must_use]
    pub fn location_uuid(&self) -> Option<Uuid> {
        self.location_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    }
}

impl NoteEvent {
    #[must_use]
    pub fn occurred_millis(&self) -> Option<i64> {
        millis(self.occurred_at)
    }
}

/// Names the independent raw streams, for error reporting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Customers,
    ScheduleLocations,
    Locations,
    Visits,
    Reports,
    Notes,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Customers => write!(f, "customers"),
            StreamKind::ScheduleLocations => write!(f, "schedule_locations"),
            StreamKind::Locations => write!(f, "locations"),
            StreamKind::Visits => write!(f, "visits"),
            StreamKind::Reports => write!(f, "reports"),
            StreamKind::Notes => write!(f, "notes"),
        }
    }
}

/// Every raw stream for one visitor, fetched together and handed to the
/// reconciliation engine as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub customers: Vec<RawCustomerRecord>,
    /// Locations referenced by the visitor's schedules.
    pub schedule_locations: Vec<RawLocation>,
    /// The full location catalog; notes reach their store name through it.
    pub locations: Vec<RawLocation>,
    pub visits: Vec<VisitEvent>,
    pub reports: Vec<ReportEvent>,
    pub notes: Vec<NoteEvent>,
}

impl Snapshot {
    /// Total number of raw records across all streams.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.customers.len()
            + self.schedule_locations.len()
            + self.locations.len()
            + self.visits.len()
            + self.reports.len()
            + self.notes.len()
    }
}
