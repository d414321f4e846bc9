//! Merging the four identity-bearing streams into one customer set.

use std::collections::{HashMap, HashSet};

use fieldvisit_core::{RawCustomerRecord, RawLocation, ReportEvent, VisitEvent};
use serde::{Deserialize, Serialize};

use crate::aggregate::Rollup;
use crate::ids::{CustomerId, IdentitySource};
use crate::normalize::{normalize, present};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Both halves or nothing.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) if latitude.is_finite() && longitude.is_finite() => {
                Some(Self {
                    latitude,
                    longitude,
                })
            }
            _ => None,
        }
    }
}

/// One reconciled real-world store, keyed by normalized name.
///
/// Built fresh from a snapshot on every load and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerIdentity {
    pub id: CustomerId,
    pub key: String,
    pub display_name: String,
    pub source: IdentitySource,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub building_number: Option<String>,
    pub municipality_zone: Option<String>,
    /// Where directions should lead.
    pub coordinates: Option<Coordinates>,
    /// `None` is the "unknown" marker.
    pub store_type: Option<String>,
    pub is_vip: bool,
    pub rollup: Rollup,
}

impl CustomerIdentity {
    fn blank(source: IdentitySource, key: String, display_name: &str, id: CustomerId) -> Self {
        Self {
            id,
            key,
            display_name: display_name.trim().to_string(),
            source,
            phone: None,
            address: None,
            building_number: None,
            municipality_zone: None,
            coordinates: None,
            store_type: None,
            is_vip: false,
            rollup: Rollup::default(),
        }
    }

    fn from_customer(key: String, record: &RawCustomerRecord, name: &str) -> Self {
        let id = CustomerId::assign(IdentitySource::Customer, &key, Some(record.id));
        Self {
            phone: owned(record.phone.as_ref()),
            address: owned(record.address.as_ref()),
            building_number: owned(record.building_number.as_ref()),
            municipality_zone: owned(record.municipality_zone.as_ref()),
            coordinates: Coordinates::from_parts(record.latitude, record.longitude),
            store_type: owned(record.store_type.as_ref()),
            is_vip: record.is_vip,
            ..Self::blank(IdentitySource::Customer, key, name, id)
        }
    }

    fn from_location(key: String, location: &RawLocation, name: &str) -> Self {
        let id = CustomerId::assign(IdentitySource::ScheduleLocation, &key, Some(location.id));
        Self {
            phone: owned(location.phone.as_ref()),
            address: owned(location.address.as_ref()),
            coordinates: Coordinates::from_parts(location.latitude, location.longitude),
            ..Self::blank(IdentitySource::ScheduleLocation, key, name, id)
        }
    }

    /// Visit seeds carry contact fields but not coordinates: a visit's
    /// position is where the visitor stood, which the attribute pass weighs
    /// by recency instead.
    fn from_visit(key: String, visit: &VisitEvent, name: &str) -> Self {
        let id = CustomerId::assign(IdentitySource::Visit, &key, None);
        Self {
            phone: owned(visit.phone.as_ref()),
            address: owned(visit.address.as_ref()),
            building_number: owned(visit.building_number.as_ref()),
            municipality_zone: owned(visit.municipality_zone.as_ref()),
            ..Self::blank(IdentitySource::Visit, key, name, id)
        }
    }

    fn from_report(key: String, report: &ReportEvent, name: &str) -> Self {
        let id = CustomerId::assign(IdentitySource::Report, &key, report.location_uuid());
        Self::blank(IdentitySource::Report, key, name, id)
    }
}

fn owned(value: Option<&String>) -> Option<String> {
    present(value).map(|v| v.trim().to_string())
}

/// The reconciled customers in creation order, with a key index.
///
/// Keys are unique: inserting a key that already exists is a no-op. Ids are
/// unique too: a row UUID already handed out falls back to the synthetic id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentitySet {
    identities: Vec<CustomerIdentity>,
    index: HashMap<String, usize>,
    ids: HashSet<CustomerId>,
}

impl IdentitySet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CustomerIdentity> {
        self.index.get(key).map(|&idx| &self.identities[idx])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CustomerIdentity> {
        let idx = *self.index.get(key)?;
        self.identities.get_mut(idx)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CustomerIdentity] {
        &self.identities
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CustomerIdentity> {
        self.identities.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CustomerIdentity> {
        self.identities.iter_mut()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<CustomerIdentity> {
        self.identities
    }

    /// Insert unless the key is taken. Returns whether the identity was added.
    fn insert_if_absent(&mut self, mut identity: CustomerIdentity) -> bool {
        if self.index.contains_key(&identity.key) {
            return false;
        }
        if self.ids.contains(&identity.id) {
            identity.id = CustomerId::assign(identity.source, &identity.key, None);
        }
        self.ids.insert(identity.id.clone());
        self.index.insert(identity.key.clone(), self.identities.len());
        self.identities.push(identity);
        true
    }
}

impl<'a> IntoIterator for &'a IdentitySet {
    type Item = &'a CustomerIdentity;
    type IntoIter = std::slice::Iter<'a, CustomerIdentity>;

    fn into_iter(self) -> Self::IntoIter {
        self.identities.iter()
    }
}

/// Build the deduplicated identity set.
///
/// Streams are consumed in fixed priority order: customers, schedule
/// locations, visits, reports. The first record to claim a normalized key
/// seeds that identity; later records with the same key never replace it.
/// Records whose name normalizes to the empty string are skipped.
pub fn resolve<'a>(
    customers: impl IntoIterator<Item = &'a RawCustomerRecord>,
    schedule_locations: impl IntoIterator<Item = &'a RawLocation>,
    visits: impl IntoIterator<Item = &'a VisitEvent>,
    reports: impl IntoIterator<Item = &'a ReportEvent>,
) -> IdentitySet {
    let mut set = IdentitySet::default();

    for record in customers {
        claim(&mut set, record.name.as_deref(), |key, name| {
            CustomerIdentity::from_customer(key, record, name)
        });
    }
    for location in schedule_locations {
        claim(&mut set, location.name.as_deref(), |key, name| {
            CustomerIdentity::from_location(key, location, name)
        });
    }
    for visit in visits {
        claim(&mut set, visit.store_name.as_deref(), |key, name| {
            CustomerIdentity::from_visit(key, visit, name)
        });
    }
    for report in reports {
        claim(&mut set, report.location_name.as_deref(), |key, name| {
            CustomerIdentity::from_report(key, report, name)
        });
    }

    set
}

fn claim<F>(set: &mut IdentitySet, name: Option<&str>, seed: F)
where
    F: FnOnce(String, &str) -> CustomerIdentity,
{
    let key = normalize(name);
    if key.is_empty() || set.contains_key(&key) {
        return;
    }
    let name = name.unwrap_or_default();
    set.insert_if_absent(seed(key, name));
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
