//! Per-identity visit statistics.

use chrono::{DateTime, Utc};
use fieldvisit_core::{NoteEvent, VisitEvent};
use serde::{Deserialize, Serialize};

use crate::catalog::LocationCatalog;
use crate::identity::IdentitySet;
use crate::normalize::{normalize, present};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollup {
    pub total_visits: u32,
    pub total_orders: u32,
    /// 0..=100, rounded half up.
    pub conversion_percent: u8,
    pub last_visit_at: Option<DateTime<Utc>>,
    /// Text of the most recent event that carried any.
    pub last_note: Option<String>,
}

/// `round(100 * orders / visits)` with halves rounded up; zero when there
/// were no visits.
#[must_use]
pub fn conversion_percent(orders: u32, visits: u32) -> u8 {
    if visits == 0 {
        return 0;
    }
    let orders = u64::from(orders.min(visits));
    let visits = u64::from(visits);
    let rounded = (200 * orders + visits) / (2 * visits);
    u8::try_from(rounded).unwrap_or(100)
}

/// One visit or note, reduced to what the rollup needs.
struct Fold<'a> {
    key: String,
    at: Option<DateTime<Utc>>,
    has_order: bool,
    text: Option<&'a str>,
}

/// Fold every matching visit and note into its identity's rollup.
///
/// Events are merged and scanned newest first (undated last, visits before
/// notes on equal timestamps), so the first text encountered is the text of
/// the most recent event that has one. Events whose key matches no identity
/// are ignored. Existing rollups are reset before folding.
pub fn aggregate<'a>(
    set: &mut IdentitySet,
    visits: impl IntoIterator<Item = &'a VisitEvent>,
    notes: impl IntoIterator<Item = &'a NoteEvent>,
    locations: &LocationCatalog<'_>,
) {
    let mut events: Vec<Fold<'a>> = visits
        .into_iter()
        .map(|v| Fold {
            key: normalize(v.store_name.as_deref()),
            at: v.occurred_at,
            has_order: v.has_order,
            text: present(v.description.as_ref()),
        })
        .chain(notes.into_iter().map(|n| Fold {
            key: locations.key_for(n.location_id),
            at: n.occurred_at,
            has_order: n.has_order,
            text: present(n.note.as_ref()),
        }))
        .collect();

    // Stable: equal timestamps keep visit-then-note order.
    events.sort_by(|a, b| b.at.cmp(&a.at));

    for identity in set.iter_mut() {
        identity.rollup = Rollup::default();
    }

    let mut folded = 0_usize;
    for event in events {
        if event.key.is_empty() {
            continue;
        }
        let Some(identity) = set.get_mut(&event.key) else {
            continue;
        };
        let rollup = &mut identity.rollup;
        rollup.total_visits += 1;
        if event.has_order {
            rollup.total_orders += 1;
        }
        if event.at > rollup.last_visit_at {
            rollup.last_visit_at = event.at;
        }
        if rollup.last_note.is_none() {
            rollup.last_note = event.text.map(|t| t.trim().to_string());
        }
        folded += 1;
    }

    for identity in set.iter_mut() {
        let rollup = &mut identity.rollup;
        rollup.conversion_percent = conversion_percent(rollup.total_orders, rollup.total_visits);
    }

    tracing::debug!(identities = set.len(), folded, "aggregated visit rollups");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::resolve;
    use crate::test_support::{at, customer, location, note, visit};
    use fieldvisit_core::{RawLocation, ReportEvent};

    fn rollup_for(
        customers: &[fieldvisit_core::RawCustomerRecord],
        visits: &[VisitEvent],
        notes: &[NoteEvent],
        locations: &[RawLocation],
        key: &str,
    ) -> Rollup {
        let mut set = resolve(customers, &[] as &[RawLocation], visits, &[] as &[ReportEvent]);
        let catalog = LocationCatalog::new(locations);
        aggregate(&mut set, visits, notes, &catalog);
        set.get(key).expect("identity").rollup.clone()
    }

    #[test]
    fn conversion_math() {
        assert_eq!(conversion_percent(0, 0), 0);
        assert_eq!(conversion_percent(1, 3), 33);
        assert_eq!(conversion_percent(1, 2), 50);
        assert_eq!(conversion_percent(2, 3), 67);
        assert_eq!(conversion_percent(1, 8), 13);
        assert_eq!(conversion_percent(3, 3), 100);
    }

    #[test]
    fn counts_visits_and_orders() {
        let mut first = visit("A", 1);
        first.has_order = true;
        let second = visit("a", 2);

        let rollup = rollup_for(&[], &[first, second], &[], &[], "a");

        assert_eq!(rollup.total_visits, 2);
        assert_eq!(rollup.total_orders, 1);
        assert_eq!(rollup.conversion_percent, 50);
        assert_eq!(rollup.last_visit_at, Some(at(2)));
    }

    #[test]
    fn notes_reach_identity_through_location_name() {
        let loc = location("Bakery");
        let mut n = note(&loc, 50);
        n.has_order = true;
        n.note = Some("restock bread".to_string());

        let rollup = rollup_for(&[customer("bakery")], &[], &[n], &[loc], "bakery");

        assert_eq!(rollup.total_visits, 1);
        assert_eq!(rollup.total_orders, 1);
        assert_eq!(rollup.conversion_percent, 100);
        assert_eq!(rollup.last_note.as_deref(), Some("restock bread"));
    }

    #[test]
    fn last_note_is_from_most_recent_event_with_text() {
        let loc = location("Shop");
        let mut old_visit = visit("shop", 10);
        old_visit.description = Some("old".to_string());
        let mut newest_note = note(&loc, 30);
        newest_note.note = Some("newest".to_string());
        let silent_latest = visit("shop", 40);

        let rollup = rollup_for(
            &[customer("Shop")],
            &[old_visit, silent_latest],
            &[newest_note],
            &[loc],
            "shop",
        );

        assert_eq!(rollup.last_note.as_deref(), Some("newest"));
        assert_eq!(rollup.last_visit_at, Some(at(40)));
    }

    #[test]
    fn equal_timestamps_prefer_visit_text() {
        let loc = location("Shop");
        let mut v = visit("shop", 10);
        v.description = Some("visit text".to_string());
        let mut n = note(&loc, 10);
        n.note = Some("note text".to_string());

        let rollup = rollup_for(&[customer("Shop")], &[v], &[n], &[loc], "shop");

        assert_eq!(rollup.last_note.as_deref(), Some("visit text"));
    }

    #[test]
    fn undated_events_count_but_never_set_last_visit() {
        let mut undated = visit("shop", 0);
        undated.occurred_at = None;
        undated.description = Some("no date".to_string());

        let rollup = rollup_for(&[customer("Shop")], &[undated], &[], &[], "shop");

        assert_eq!(rollup.total_visits, 1);
        assert_eq!(rollup.last_visit_at, None);
        assert_eq!(rollup.last_note.as_deref(), Some("no date"));
    }

    #[test]
    fn unmatched_events_are_dropped() {
        let orphan_location = location("Nowhere");
        let visits = [visit("shop", 1), visit("elsewhere", 2)];
        let notes = [note(&orphan_location, 3), note(&location("unlisted"), 4)];

        let mut set = resolve(
            &[customer("Shop")],
            &[] as &[RawLocation],
            &[] as &[VisitEvent],
            &[] as &[ReportEvent],
        );
        let catalog = LocationCatalog::new([&orphan_location]);
        aggregate(&mut set, &visits, &notes, &catalog);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("shop").unwrap().rollup.total_visits, 1);
    }

    #[test]
    fn aggregating_twice_does_not_double_count() {
        let visits = [visit("shop", 1)];
        let mut set = resolve(
            &[customer("Shop")],
            &[] as &[RawLocation],
            &visits,
            &[] as &[ReportEvent],
        );
        let catalog = LocationCatalog::default();
        aggregate(&mut set, &visits, &[] as &[NoteEvent], &catalog);
        aggregate(&mut set, &visits, &[] as &[NoteEvent], &catalog);

        assert_eq!(set.get("shop").unwrap().rollup.total_visits, 1);
    }
}
