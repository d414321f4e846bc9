//! Gap-filling display attributes from the richer streams.
//!
//! Every rule writes only into an absent field, except store type, which is
//! recomputed from the latest event each time.

use std::collections::HashMap;

use fieldvisit_core::{ReportEvent, VisitEvent};

use crate::catalog::LocationCatalog;
use crate::identity::{Coordinates, CustomerIdentity, IdentitySet};
use crate::normalize::{normalize, present};

/// Visits and reports grouped by normalized store name.
///
/// Built once per load and shared by every identity's attribute pass.
#[derive(Debug, Default)]
pub struct EventIndex<'a> {
    visits: HashMap<String, Vec<&'a VisitEvent>>,
    reports: HashMap<String, Vec<&'a ReportEvent>>,
}

impl<'a> EventIndex<'a> {
    pub fn new(
        visits: impl IntoIterator<Item = &'a VisitEvent>,
        reports: impl IntoIterator<Item = &'a ReportEvent>,
    ) -> Self {
        let mut index = Self::default();
        for visit in visits {
            let key = normalize(visit.store_name.as_deref());
            if !key.is_empty() {
                index.visits.entry(key).or_default().push(visit);
            }
        }
        for report in reports {
            let key = normalize(report.location_name.as_deref());
            if !key.is_empty() {
                index.reports.entry(key).or_default().push(report);
            }
        }
        index
    }

    fn visits(&self, key: &str) -> &[&'a VisitEvent] {
        self.visits.get(key).map_or(&[], Vec::as_slice)
    }

    fn reports(&self, key: &str) -> &[&'a ReportEvent] {
        self.reports.get(key).map_or(&[], Vec::as_slice)
    }
}

/// Keeps the candidate with the strictly latest timestamp.
///
/// Candidates offered earlier win ties, and a missing timestamp loses to any
/// real one, so the stream order (visits, then reports) breaks ties.
struct Latest<T> {
    best: Option<(Option<i64>, T)>,
}

impl<T> Latest<T> {
    fn new() -> Self {
        Self { best: None }
    }

    fn offer(&mut self, at: Option<i64>, value: T) {
        let newer = match &self.best {
            None => true,
            Some((best_at, _)) => at > *best_at,
        };
        if newer {
            self.best = Some((at, value));
        }
    }

    fn into_value(self) -> Option<T> {
        self.best.map(|(_, value)| value)
    }
}

/// Latest non-blank value of one field among the identity's visits.
fn latest_visit_field<'v>(
    visits: &[&'v VisitEvent],
    field: impl Fn(&'v VisitEvent) -> Option<&'v String>,
) -> Option<String> {
    let mut latest = Latest::new();
    for &visit in visits {
        if let Some(value) = present(field(visit)) {
            latest.offer(visit.occurred_millis(), value);
        }
    }
    latest.into_value().map(|v| v.trim().to_string())
}

fn fill(slot: &mut Option<String>, candidate: impl FnOnce() -> Option<String>) {
    if slot.is_none() {
        *slot = candidate();
    }
}

/// Enrich one identity in place.
///
/// Contact fields come from the most recent visit that has that particular
/// field, each field independently, then from same-named catalog locations
/// (phone and address only). Coordinates come from a same-named location,
/// else the most recent visit or report that recorded a position. Store type
/// is the type on the most recent visit or report, else the identity's own.
pub fn fill_attributes(
    identity: &mut CustomerIdentity,
    events: &EventIndex<'_>,
    locations: &LocationCatalog<'_>,
) {
    let visits = events.visits(&identity.key);
    let reports = events.reports(&identity.key);
    let named_locations = locations.named(&identity.key);

    fill(&mut identity.phone, || {
        latest_visit_field(visits, |v| v.phone.as_ref())
    });
    fill(&mut identity.address, || {
        latest_visit_field(visits, |v| v.address.as_ref())
    });
    fill(&mut identity.building_number, || {
        latest_visit_field(visits, |v| v.building_number.as_ref())
    });
    fill(&mut identity.municipality_zone, || {
        latest_visit_field(visits, |v| v.municipality_zone.as_ref())
    });

    fill(&mut identity.phone, || {
        named_locations
            .iter()
            .find_map(|loc| present(loc.phone.as_ref()))
            .map(|v| v.trim().to_string())
    });
    fill(&mut identity.address, || {
        named_locations
            .iter()
            .find_map(|loc| present(loc.address.as_ref()))
            .map(|v| v.trim().to_string())
    });

    if identity.coordinates.is_none() {
        identity.coordinates = named_locations
            .iter()
            .find_map(|loc| Coordinates::from_parts(loc.latitude, loc.longitude))
            .or_else(|| latest_event_coordinates(visits, reports));
    }

    let mut store_type = Latest::new();
    for &visit in visits {
        if let Some(kind) = present(visit.store_type.as_ref()) {
            store_type.offer(visit.occurred_millis(), kind);
        }
    }
    for &report in reports {
        if let Some(kind) = present(report.store_type.as_ref()) {
            store_type.offer(report.occurred_millis(), kind);
        }
    }
    if let Some(kind) = store_type.into_value() {
        identity.store_type = Some(kind.trim().to_string());
    }
}

fn latest_event_coordinates(
    visits: &[&VisitEvent],
    reports: &[&ReportEvent],
) -> Option<Coordinates> {
    let mut latest = Latest::new();
    for &visit in visits {
        if let Some(coords) = Coordinates::from_parts(visit.latitude, visit.longitude) {
            latest.offer(visit.occurred_millis(), coords);
        }
    }
    for &report in reports {
        if let Some(coords) = Coordinates::from_parts(report.latitude, report.longitude) {
            latest.offer(report.occurred_millis(), coords);
        }
    }
    latest.into_value()
}

/// Run [`fill_attributes`] over every identity in the set.
pub fn fill_all(set: &mut IdentitySet, events: &EventIndex<'_>, locations: &LocationCatalog<'_>) {
    for identity in set.iter_mut() {
        fill_attributes(identity, events, locations);
    }
}

#[cfg(test)]
#[path = "attributes_test.rs"]
mod tests;
