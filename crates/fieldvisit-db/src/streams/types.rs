//! Row types for the field stream tables and their conversion into the
//! engine's record shapes.

use chrono::{DateTime, Utc};
use fieldvisit_core::{NoteEvent, RawCustomerRecord, RawLocation, ReportEvent, VisitEvent};
use uuid::Uuid;

/// A row from the `customers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub building_number: Option<String>,
    pub municipality_zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub store_type: Option<String>,
    pub is_vip: bool,
    pub created_by: Uuid,
    pub created_at: Option<DateTime<Utc>>,
}

/// A row from the `locations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LocationRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A row from the `visits` table with legacy columns already merged.
///
/// `has_order` is `COALESCE(has_order, order_placed, FALSE)` and
/// `store_type` falls back to `shop_type`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VisitRow {
    pub id: Uuid,
    pub store_name: Option<String>,
    pub store_type: Option<String>,
    pub has_order: bool,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub building_number: Option<String>,
    pub municipality_zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A row from the `reports` table. `has_order` comes from `order_placed`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub location_id: Option<String>,
    pub location_name: Option<String>,
    pub store_type: Option<String>,
    pub has_order: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A row from the `visit_notes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NoteRow {
    pub id: Uuid,
    pub location_id: Option<Uuid>,
    pub note: Option<String>,
    pub has_order: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub schedule_id: Option<Uuid>,
}

impl From<CustomerRow> for RawCustomerRecord {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            phone: row.phone,
            address: row.address,
            building_number: row.building_number,
            municipality_zone: row.municipality_zone,
            latitude: row.latitude,
            longitude: row.longitude,
            store_type: row.store_type,
            is_vip: row.is_vip,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

impl From<LocationRow> for RawLocation {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            phone: row.phone,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

impl From<VisitRow> for VisitEvent {
    fn from(row: VisitRow) -> Self {
        Self {
            id: row.id,
            store_name: row.store_name,
            store_type: row.store_type,
            has_order: row.has_order,
            description: row.description,
            occurred_at: row.created_at,
            phone: row.phone,
            address: row.address,
            building_number: row.building_number,
            municipality_zone: row.municipality_zone,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

impl From<ReportRow> for ReportEvent {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            location_id: row.location_id,
            location_name: row.location_name,
            store_type: row.store_type,
            has_order: row.has_order,
            occurred_at: row.created_at,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

impl From<NoteRow> for NoteEvent {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            location_id: row.location_id,
            note: row.note,
            has_order: row.has_order,
            occurred_at: row.created_at,
            schedule_id: row.schedule_id,
        }
    }
}
