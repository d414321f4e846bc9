//! Read queries for the field stream tables.
//!
//! Rows come back in a convenient order but callers must not rely on it:
//! the engine puts every stream in its own canonical order.

use sqlx::PgPool;
use uuid::Uuid;

use super::types::{CustomerRow, LocationRow, NoteRow, ReportRow, VisitRow};
use crate::DbError;

/// Maximum rows returned by [`search_locations_by_name`].
pub const LOCATION_SEARCH_LIMIT: i64 = 50;

const LOCATION_COLUMNS: &str = "l.id, l.name, l.address, l.phone, l.latitude, l.longitude";

/// Customers created by `owner`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_customers_by_owner(
    pool: &PgPool,
    owner: Uuid,
) -> Result<Vec<CustomerRow>, DbError> {
    let rows = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, name, phone, address, building_number, municipality_zone, \
                latitude, longitude, store_type, is_vip, created_by, created_at \
         FROM customers \
         WHERE created_by = $1 \
         ORDER BY created_at DESC NULLS LAST, id",
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Distinct locations referenced by any of `visitor`'s schedules.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_schedule_locations_by_visitor(
    pool: &PgPool,
    visitor: Uuid,
) -> Result<Vec<LocationRow>, DbError> {
    let sql = format!(
        "SELECT DISTINCT {LOCATION_COLUMNS} \
         FROM schedules s \
         JOIN schedule_locations sl ON sl.schedule_id = s.id \
         JOIN locations l ON l.id = sl.location_id \
         WHERE s.visitor_id = $1 \
         ORDER BY l.id"
    );
    let rows = sqlx::query_as::<_, LocationRow>(&sql)
        .bind(visitor)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// The full location catalog.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_locations(pool: &PgPool) -> Result<Vec<LocationRow>, DbError> {
    let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations l ORDER BY l.id");
    let rows = sqlx::query_as::<_, LocationRow>(&sql)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Ad-hoc visits logged by `user`, newest first.
///
/// Legacy `order_placed` and `shop_type` values are folded in here so the
/// engine only ever sees one order flag and one store type per visit.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_visits_by_user(pool: &PgPool, user: Uuid) -> Result<Vec<VisitRow>, DbError> {
    let rows = sqlx::query_as::<_, VisitRow>(
        "SELECT id, store_name, \
                COALESCE(NULLIF(store_type, ''), NULLIF(shop_type, '')) AS store_type, \
                COALESCE(has_order, order_placed, FALSE) AS has_order, \
                description, created_at, phone, address, building_number, \
                municipality_zone, latitude, longitude \
         FROM visits \
         WHERE user_id = $1 \
         ORDER BY created_at DESC NULLS LAST, id",
    )
    .bind(user)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Report-log entries written by `visitor`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reports_by_visitor(
    pool: &PgPool,
    visitor: Uuid,
) -> Result<Vec<ReportRow>, DbError> {
    let rows = sqlx::query_as::<_, ReportRow>(
        "SELECT id, location_id, location_name, store_type, \
                COALESCE(order_placed, FALSE) AS has_order, \
                created_at, latitude, longitude \
         FROM reports \
         WHERE visitor_id = $1 \
         ORDER BY created_at DESC NULLS LAST, id",
    )
    .bind(visitor)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Location notes written by `visitor`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_notes_by_visitor(
    pool: &PgPool,
    visitor: Uuid,
) -> Result<Vec<NoteRow>, DbError> {
    let rows = sqlx::query_as::<_, NoteRow>(
        "SELECT id, location_id, note, has_order, created_at, schedule_id \
         FROM visit_notes \
         WHERE visitor_id = $1 \
         ORDER BY created_at DESC NULLS LAST, id",
    )
    .bind(visitor)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Catalog locations whose name contains `substring`, case-insensitively.
///
/// `%` and `_` in the input match literally. At most
/// [`LOCATION_SEARCH_LIMIT`] rows are returned, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_locations_by_name(
    pool: &PgPool,
    substring: &str,
) -> Result<Vec<LocationRow>, DbError> {
    let sql = format!(
        "SELECT {LOCATION_COLUMNS} FROM locations l \
         WHERE l.name ILIKE $1 ESCAPE '\\' \
         ORDER BY l.name, l.id \
         LIMIT $2"
    );
    let rows = sqlx::query_as::<_, LocationRow>(&sql)
        .bind(like_pattern(substring))
        .bind(LOCATION_SEARCH_LIMIT)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Build a `LIKE` pattern matching `substring` anywhere, with wildcards in
/// the input escaped.
#[must_use]
pub fn like_pattern(substring: &str) -> String {
    let mut pattern = String::with_capacity(substring.len() + 2);
    pattern.push('%');
    for ch in substring.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
