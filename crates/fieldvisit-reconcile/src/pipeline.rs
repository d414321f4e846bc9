//! End-to-end entry points: snapshot in, customer list or detail out.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use fieldvisit_core::{
    NoteEvent, RawCustomerRecord, RawLocation, ReportEvent, Snapshot, VisitEvent,
};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::attributes::{fill_all, EventIndex};
use crate::catalog::LocationCatalog;
use crate::identity::{resolve, CustomerIdentity, IdentitySet};
use crate::ids::{CustomerId, CustomerRef};
use crate::normalize::normalize;
use crate::timeline::{assemble_timeline, TimelineEntry};

/// Newest first, undated last.
fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    b.cmp(&a)
}

/// Every stream in a fixed order that depends only on record content.
///
/// First-writer-wins is applied to this order, which is what makes the
/// resolved set independent of the order rows were fetched in.
struct Canonical<'a> {
    customers: Vec<&'a RawCustomerRecord>,
    schedule_locations: Vec<&'a RawLocation>,
    locations: Vec<&'a RawLocation>,
    visits: Vec<&'a VisitEvent>,
    reports: Vec<&'a ReportEvent>,
    notes: Vec<&'a NoteEvent>,
}

impl<'a> Canonical<'a> {
    fn new(snapshot: &'a Snapshot) -> Self {
        let mut customers: Vec<_> = snapshot.customers.iter().collect();
        customers.sort_by(|a, b| newest_first(a.created_at, b.created_at).then(a.id.cmp(&b.id)));

        let mut schedule_locations: Vec<_> = snapshot.schedule_locations.iter().collect();
        schedule_locations.sort_by_key(|l| l.id);

        let mut locations: Vec<_> = snapshot.locations.iter().collect();
        locations.sort_by_key(|l| l.id);

        let mut visits: Vec<_> = snapshot.visits.iter().collect();
        visits.sort_by(|a, b| newest_first(a.occurred_at, b.occurred_at).then(a.id.cmp(&b.id)));

        let mut reports: Vec<_> = snapshot.reports.iter().collect();
        reports.sort_by(|a, b| newest_first(a.occurred_at, b.occurred_at).then(a.id.cmp(&b.id)));

        let mut notes: Vec<_> = snapshot.notes.iter().collect();
        notes.sort_by(|a, b| newest_first(a.occurred_at, b.occurred_at).then(a.id.cmp(&b.id)));

        Self {
            customers,
            schedule_locations,
            locations,
            visits,
            reports,
            notes,
        }
    }

    /// The full catalog plus schedule locations, for id and name lookups.
    fn catalog(&self) -> LocationCatalog<'a> {
        LocationCatalog::new(
            self.locations
                .iter()
                .chain(self.schedule_locations.iter())
                .copied(),
        )
    }
}

/// Resolve, enrich and aggregate every customer in the snapshot.
#[must_use]
pub fn build_customer_list(snapshot: &Snapshot) -> IdentitySet {
    let canonical = Canonical::new(snapshot);
    build_from(&canonical)
}

fn build_from(canonical: &Canonical<'_>) -> IdentitySet {
    let catalog = canonical.catalog();

    let mut set = resolve(
        canonical.customers.iter().copied(),
        canonical.schedule_locations.iter().copied(),
        canonical.visits.iter().copied(),
        canonical.reports.iter().copied(),
    );

    let events = EventIndex::new(
        canonical.visits.iter().copied(),
        canonical.reports.iter().copied(),
    );
    fill_all(&mut set, &events, &catalog);
    aggregate(
        &mut set,
        canonical.visits.iter().copied(),
        canonical.notes.iter().copied(),
        &catalog,
    );

    tracing::debug!(identities = set.len(), "built customer list");
    set
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDetail {
    pub identity: CustomerIdentity,
    pub timeline: Vec<TimelineEntry>,
}

/// One customer with its full history, or `None` if the id matches nothing.
///
/// An exact identity id always wins. A UUID is then matched against the
/// customer and location rows, so a row absorbed into a same-named identity
/// still leads to that identity. A prefixed id is tried as a typed store name
/// before its decoded key; anything else matches by normalized name.
#[must_use]
pub fn customer_detail(snapshot: &Snapshot, id: &CustomerId) -> Option<CustomerDetail> {
    let canonical = Canonical::new(snapshot);
    let set = build_from(&canonical);
    let catalog = canonical.catalog();

    let exact = set
        .iter()
        .find(|i| i.id.as_str() == id.as_str().trim())
        .map(|i| i.key.clone());
    let key = match (exact, id.parse()) {
        (Some(key), _) => key,
        (None, CustomerRef::Row(uuid)) => key_for_row(&canonical, &catalog, uuid)?,
        (None, CustomerRef::Synthetic(key)) => {
            let name_key = id.as_name_key();
            if set.contains_key(&name_key) {
                name_key
            } else {
                key
            }
        }
        (None, CustomerRef::Key(key)) => key,
    };
    let identity = set.get(&key)?.clone();

    // Timeline entries keep fetch-independent order on equal timestamps.
    let mut visits = canonical.visits.clone();
    visits.sort_by_key(|v| v.id);
    let mut notes = canonical.notes.clone();
    notes.sort_by_key(|n| n.id);
    let timeline = assemble_timeline(&key, visits, notes, &catalog);

    Some(CustomerDetail { identity, timeline })
}

fn key_for_row(
    canonical: &Canonical<'_>,
    catalog: &LocationCatalog<'_>,
    uuid: Uuid,
) -> Option<String> {
    let from_customer = canonical
        .customers
        .iter()
        .find(|c| c.id == uuid)
        .map(|c| normalize(c.name.as_deref()));
    let key = from_customer.unwrap_or_else(|| catalog.key_for(Some(uuid)));
    (!key.is_empty()).then_some(key)
}
