//! Lookup tables over the location catalog.

use std::collections::HashMap;

use fieldvisit_core::RawLocation;
use uuid::Uuid;

use crate::normalize;

/// Locations indexed by id and by normalized name.
///
/// Name buckets keep catalog order, so "first location with a phone" is
/// well defined once the catalog itself is in a stable order.
#[derive(Debug, Default)]
pub struct LocationCatalog<'a> {
    by_id: HashMap<Uuid, &'a RawLocation>,
    by_key: HashMap<String, Vec<&'a RawLocation>>,
}

impl<'a> LocationCatalog<'a> {
    pub fn new(locations: impl IntoIterator<Item = &'a RawLocation>) -> Self {
        let mut catalog = Self::default();
        for location in locations {
            catalog.by_id.entry(location.id).or_insert(location);
            let key = normalize(location.name.as_deref());
            if !key.is_empty() {
                catalog.by_key.entry(key).or_default().push(location);
            }
        }
        catalog
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&'a RawLocation> {
        self.by_id.get(&id).copied()
    }

    /// Normalized store name of the location with this id.
    ///
    /// Empty when the location is unknown or unnamed.
    #[must_use]
    pub fn key_for(&self, id: Option<Uuid>) -> String {
        id.and_then(|id| self.get(id))
            .map(|loc| normalize(loc.name.as_deref()))
            .unwrap_or_default()
    }

    /// Locations whose name normalizes to `key`, in catalog order.
    #[must_use]
    pub fn named(&self, key: &str) -> &[&'a RawLocation] {
        self.by_key.get(key).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(name: &str) -> RawLocation {
        RawLocation {
            id: Uuid::new_v4(),
            name: Some(name.to_string()),
            ..RawLocation::default()
        }
    }

    #[test]
    fn key_for_resolves_through_id() {
        let loc = location(" Bakery Lane ");
        let catalog = LocationCatalog::new([&loc]);
        assert_eq!(catalog.key_for(Some(loc.id)), "bakery lane");
        assert_eq!(catalog.key_for(Some(Uuid::new_v4())), "");
        assert_eq!(catalog.key_for(None), "");
    }

    #[test]
    fn named_groups_casing_variants_in_order() {
        let a = location("Bakery");
        let b = location("BAKERY ");
        let locations = vec![a.clone(), b.clone()];
        let catalog = LocationCatalog::new(&locations);
        let ids: Vec<Uuid> = catalog.named("bakery").iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert!(catalog.named("missing").is_empty());
    }

    #[test]
    fn unnamed_locations_are_not_indexed_by_name() {
        let loc = RawLocation::default();
        let catalog = LocationCatalog::new([&loc]);
        assert!(catalog.named("").is_empty());
    }
}
