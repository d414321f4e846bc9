//! Per-customer visit history for the detail view.

use chrono::{DateTime, Utc};
use fieldvisit_core::{NoteEvent, VisitEvent};
use serde::{Deserialize, Serialize};

use crate::catalog::LocationCatalog;
use crate::normalize::{normalize, present};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineKind {
    FieldVisit,
    ScheduledVisit,
    Note,
}

impl std::fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimelineKind::FieldVisit => write!(f, "field-visit"),
            TimelineKind::ScheduledVisit => write!(f, "scheduled-visit"),
            TimelineKind::Note => write!(f, "note"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// `v-<visit id>` or `n-<note id>`.
    pub id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub has_order: bool,
    pub description: Option<String>,
    pub kind: TimelineKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderFilter {
    #[default]
    All,
    WithOrder,
    WithoutOrder,
}

impl OrderFilter {
    #[must_use]
    pub fn accepts(self, entry: &TimelineEntry) -> bool {
        match self {
            OrderFilter::All => true,
            OrderFilter::WithOrder => entry.has_order,
            OrderFilter::WithoutOrder => !entry.has_order,
        }
    }
}

impl std::str::FromStr for OrderFilter {
    type Err = crate::query::UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "with-order" => Ok(Self::WithOrder),
            "without-order" => Ok(Self::WithoutOrder),
            other => Err(crate::query::UnknownVariant(other.to_string())),
        }
    }
}

/// All visits and notes for one normalized key, newest first.
///
/// Undated entries go last. Equal timestamps keep source order: visits in
/// input order, then notes in input order.
pub fn assemble_timeline<'a>(
    key: &str,
    visits: impl IntoIterator<Item = &'a VisitEvent>,
    notes: impl IntoIterator<Item = &'a NoteEvent>,
    locations: &LocationCatalog<'_>,
) -> Vec<TimelineEntry> {
    if key.is_empty() {
        return Vec::new();
    }

    let field_visits = visits
        .into_iter()
        .filter(|v| normalize(v.store_name.as_deref()) == key)
        .map(|v| TimelineEntry {
            id: format!("v-{}", v.id),
            timestamp: v.occurred_at,
            has_order: v.has_order,
            description: present(v.description.as_ref()).map(str::to_string),
            kind: TimelineKind::FieldVisit,
        });

    let note_entries = notes
        .into_iter()
        .filter(|n| locations.key_for(n.location_id) == key)
        .map(|n| TimelineEntry {
            id: format!("n-{}", n.id),
            timestamp: n.occurred_at,
            has_order: n.has_order,
            description: present(n.note.as_ref()).map(str::to_string),
            kind: if n.schedule_id.is_some() {
                TimelineKind::ScheduledVisit
            } else {
                TimelineKind::Note
            },
        });

    let mut entries: Vec<TimelineEntry> = field_visits.chain(note_entries).collect();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

/// Keep only entries accepted by `filter`, preserving order.
#[must_use]
pub fn filter_timeline(entries: &[TimelineEntry], filter: OrderFilter) -> Vec<TimelineEntry> {
    entries
        .iter()
        .filter(|entry| filter.accepts(entry))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, location, note, visit};
    use uuid::Uuid;

    #[test]
    fn kind_display_matches_wire_name() {
        for kind in [
            TimelineKind::FieldVisit,
            TimelineKind::ScheduledVisit,
            TimelineKind::Note,
        ] {
            let wire = serde_json::to_value(kind).unwrap();
            assert_eq!(wire.as_str(), Some(kind.to_string().as_str()));
        }
    }

    #[test]
    fn mixed_kinds_sort_newest_first() {
        let loc = location("Shop");
        let mut scheduled = note(&loc, 1);
        scheduled.schedule_id = Some(Uuid::new_v4());
        let visits = [visit("shop", 3)];
        let notes = [scheduled, note(&loc, 2)];
        let catalog = LocationCatalog::new([&loc]);

        let timeline = assemble_timeline("shop", &visits, &notes, &catalog);

        let stamps: Vec<_> = timeline.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![Some(at(3)), Some(at(2)), Some(at(1))]);
        let kinds: Vec<_> = timeline.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TimelineKind::FieldVisit,
                TimelineKind::Note,
                TimelineKind::ScheduledVisit
            ]
        );
    }

    #[test]
    fn equal_timestamps_put_visits_before_notes() {
        let loc = location("Shop");
        let n = note(&loc, 5);
        let v = visit("SHOP", 5);
        let catalog = LocationCatalog::new([&loc]);

        let timeline = assemble_timeline("shop", [&v], [&n], &catalog);

        assert_eq!(timeline[0].id, format!("v-{}", v.id));
        assert_eq!(timeline[1].id, format!("n-{}", n.id));
    }

    #[test]
    fn other_stores_and_undated_entries() {
        let loc = location("Shop");
        let mut undated = visit("shop", 0);
        undated.occurred_at = None;
        let visits = [undated, visit("other", 9), visit("shop", 1)];
        let catalog = LocationCatalog::new([&loc]);

        let timeline = assemble_timeline("shop", &visits, &[] as &[NoteEvent], &catalog);

        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].timestamp, Some(at(1)));
        assert_eq!(timeline[1].timestamp, None);
    }

    #[test]
    fn blank_key_yields_nothing() {
        let visits = [visit("  ", 1)];
        let timeline = assemble_timeline(
            "",
            &visits,
            &[] as &[NoteEvent],
            &LocationCatalog::default(),
        );
        assert!(timeline.is_empty());
    }

    #[test]
    fn filter_by_order_outcome() {
        let mut ordered = visit("shop", 2);
        ordered.has_order = true;
        let visits = [ordered, visit("shop", 1)];
        let timeline = assemble_timeline(
            "shop",
            &visits,
            &[] as &[NoteEvent],
            &LocationCatalog::default(),
        );

        assert_eq!(filter_timeline(&timeline, OrderFilter::All).len(), 2);
        let with = filter_timeline(&timeline, OrderFilter::WithOrder);
        assert_eq!(with.len(), 1);
        assert!(with[0].has_order);
        let without = filter_timeline(&timeline, OrderFilter::WithoutOrder);
        assert_eq!(without[0].timestamp, Some(at(1)));
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&TimelineKind::ScheduledVisit).unwrap();
        assert_eq!(json, "\"scheduled-visit\"");
    }
}
