//! Reconciles free-text store names from every field stream into one
//! customer list, with per-customer statistics and history.
//!
//! Everything here is pure: a [`fieldvisit_core::Snapshot`] goes in, derived
//! views come out. Fetching lives in `fieldvisit-db`.

pub mod aggregate;
pub mod attributes;
pub mod catalog;
pub mod identity;
pub mod ids;
pub mod navigation;
mod normalize;
pub mod pipeline;
pub mod query;
pub mod timeline;
pub mod totals;

#[cfg(test)]
mod test_support;

pub use aggregate::{aggregate, conversion_percent, Rollup};
pub use attributes::{fill_all, fill_attributes, EventIndex};
pub use catalog::LocationCatalog;
pub use identity::{resolve, Coordinates, CustomerIdentity, IdentitySet};
pub use ids::{CustomerId, CustomerRef, IdentitySource};
pub use navigation::{customer_navigation_url, navigation_url, NavPlatform};
pub use normalize::normalize;
pub use pipeline::{build_customer_list, customer_detail, CustomerDetail};
pub use query::{query, QueryOptions, SortField, SortOrder, UnknownVariant};
pub use timeline::{assemble_timeline, filter_timeline, OrderFilter, TimelineEntry, TimelineKind};
pub use totals::{totals, Totals};
