//! Filtering and sorting over a resolved customer list.
//!
//! Queries borrow the resolved identities and return a new ordering; the
//! underlying set is never touched, so it can be re-queried per keystroke.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::identity::CustomerIdentity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    TotalVisits,
    TotalOrders,
    ConversionPercent,
    #[default]
    LastVisitAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl std::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unrecognized value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for SortField {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "total_visits" | "visits" => Ok(Self::TotalVisits),
            "total_orders" | "orders" => Ok(Self::TotalOrders),
            "conversion_percent" | "conversion" => Ok(Self::ConversionPercent),
            "last_visit_at" | "last_visit" => Ok(Self::LastVisitAt),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Defaults to everything, most recently visited first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub search_text: String,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

/// Case-insensitive substring match on name, phone, address and store type.
fn matches(identity: &CustomerIdentity, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [
        Some(identity.display_name.as_str()),
        identity.phone.as_deref(),
        identity.address.as_deref(),
        identity.store_type.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

fn compare(a: &CustomerIdentity, b: &CustomerIdentity, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.display_name.cmp(&b.display_name),
        SortField::TotalVisits => a.rollup.total_visits.cmp(&b.rollup.total_visits),
        SortField::TotalOrders => a.rollup.total_orders.cmp(&b.rollup.total_orders),
        SortField::ConversionPercent => a
            .rollup
            .conversion_percent
            .cmp(&b.rollup.conversion_percent),
        SortField::LastVisitAt => last_visit_millis(a).cmp(&last_visit_millis(b)),
    }
}

/// Missing last visit sorts as the epoch.
fn last_visit_millis(identity: &CustomerIdentity) -> i64 {
    identity
        .rollup
        .last_visit_at
        .map_or(0, |t| t.timestamp_millis())
}

/// Filter then stable-sort. Ties keep their input order in both directions.
#[must_use]
pub fn query<'a>(identities: &'a [CustomerIdentity], options: &QueryOptions) -> Vec<&'a CustomerIdentity> {
    let needle = options.search_text.trim().to_lowercase();
    let mut rows: Vec<&CustomerIdentity> = identities
        .iter()
        .filter(|identity| matches(identity, &needle))
        .collect();

    let field = options.sort_field;
    match options.sort_order {
        SortOrder::Asc => rows.sort_by(|a, b| compare(a, b, field)),
        SortOrder::Desc => rows.sort_by(|a, b| compare(b, a, field)),
    }
    rows
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
