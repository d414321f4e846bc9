//! Read operations for the raw field streams, one query per stream.

mod read;
mod types;

pub use read::{
    like_pattern, list_customers_by_owner, list_locations, list_notes_by_visitor,
    list_reports_by_visitor, list_schedule_locations_by_visitor, list_visits_by_user,
    search_locations_by_name, LOCATION_SEARCH_LIMIT,
};
pub use types::{CustomerRow, LocationRow, NoteRow, ReportRow, VisitRow};
