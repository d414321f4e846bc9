//! Record builders shared by the unit tests.

use chrono::{DateTime, TimeZone, Utc};
use fieldvisit_core::{NoteEvent, RawCustomerRecord, RawLocation, ReportEvent, VisitEvent};
use uuid::Uuid;

pub(crate) fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

pub(crate) fn customer(name: &str) -> RawCustomerRecord {
    RawCustomerRecord {
        id: Uuid::new_v4(),
        name: Some(name.to_string()),
        ..RawCustomerRecord::default()
    }
}

pub(crate) fn location(name: &str) -> RawLocation {
    RawLocation {
        id: Uuid::new_v4(),
        name: Some(name.to_string()),
        ..RawLocation::default()
    }
}

pub(crate) fn visit(name: &str, ms: i64) -> VisitEvent {
    VisitEvent {
        id: Uuid::new_v4(),
        store_name: Some(name.to_string()),
        occurred_at: Some(at(ms)),
        ..VisitEvent::default()
    }
}

pub(crate) fn report(name: &str, ms: i64) -> ReportEvent {
    ReportEvent {
        id: Uuid::new_v4(),
        location_name: Some(name.to_string()),
        occurred_at: Some(at(ms)),
        ..ReportEvent::default()
    }
}

pub(crate) fn note(location: &RawLocation, ms: i64) -> NoteEvent {
    NoteEvent {
        id: Uuid::new_v4(),
        location_id: Some(location.id),
        occurred_at: Some(at(ms)),
        ..NoteEvent::default()
    }
}
