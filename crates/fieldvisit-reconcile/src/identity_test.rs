use fieldvisit_core::{RawCustomerRecord, RawLocation, ReportEvent, VisitEvent};
use uuid::Uuid;

use super::*;
use crate::ids::CustomerRef;
use crate::test_support::{customer, location, report, visit};

fn no_customers() -> Vec<RawCustomerRecord> {
    Vec::new()
}

fn no_locations() -> Vec<RawLocation> {
    Vec::new()
}

fn no_visits() -> Vec<VisitEvent> {
    Vec::new()
}

fn no_reports() -> Vec<ReportEvent> {
    Vec::new()
}

// -----------------------------------------------------------------------
// uniqueness
// -----------------------------------------------------------------------

#[test]
fn casing_variants_across_all_streams_collapse_to_one_identity() {
    let customers = vec![customer("Pharmacy One")];
    let locations = vec![location(" pharmacy one ")];
    let visits = vec![visit("PHARMACY ONE", 1)];
    let reports = vec![report("Pharmacy one", 2)];

    let set = resolve(&customers, &locations, &visits, &reports);

    assert_eq!(set.len(), 1);
    let identity = set.get("pharmacy one").expect("identity");
    assert_eq!(identity.source, IdentitySource::Customer);
    assert_eq!(identity.display_name, "Pharmacy One");
}

#[test]
fn duplicate_names_within_one_stream_keep_the_first() {
    let mut first = customer("Bakery");
    first.phone = Some("111".to_string());
    let mut second = customer("bakery");
    second.phone = Some("222".to_string());
    let customers = vec![first.clone(), second];

    let set = resolve(&customers, &no_locations(), &no_visits(), &no_reports());

    assert_eq!(set.len(), 1);
    let identity = set.get("bakery").unwrap();
    assert_eq!(identity.phone.as_deref(), Some("111"));
    assert_eq!(identity.id.parse(), CustomerRef::Row(first.id));
}

// -----------------------------------------------------------------------
// precedence
// -----------------------------------------------------------------------

#[test]
fn customer_seed_wins_over_visit_seed() {
    let mut c = customer("Shop");
    c.phone = Some("111".to_string());
    let mut v = visit("shop", 5);
    v.phone = Some("222".to_string());

    let set = resolve(&[c], &no_locations(), &[v], &no_reports());

    assert_eq!(set.get("shop").unwrap().phone.as_deref(), Some("111"));
}

#[test]
fn schedule_location_beats_visit_and_report() {
    let mut loc = location("Kiosk");
    loc.address = Some("North St".to_string());
    let set = resolve(
        &no_customers(),
        &[loc.clone()],
        &[visit("kiosk", 1)],
        &[report("KIOSK", 2)],
    );

    let identity = set.get("kiosk").unwrap();
    assert_eq!(identity.source, IdentitySource::ScheduleLocation);
    assert_eq!(identity.id.as_str(), loc.id.to_string());
    assert_eq!(identity.address.as_deref(), Some("North St"));
}

#[test]
fn stream_order_determines_set_order() {
    let set = resolve(
        &[customer("C")],
        &[location("L")],
        &[visit("V", 1)],
        &[report("R", 1)],
    );
    let keys: Vec<&str> = set.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["c", "l", "v", "r"]);
}

// -----------------------------------------------------------------------
// malformed records
// -----------------------------------------------------------------------

#[test]
fn unnamed_and_blank_records_are_skipped() {
    let mut nameless = customer("x");
    nameless.name = None;
    let blank = visit("   ", 1);

    let set = resolve(&[nameless], &no_locations(), &[blank], &no_reports());

    assert!(set.is_empty());
}

#[test]
fn blank_contact_fields_are_not_seeded() {
    let mut c = customer("Shop");
    c.phone = Some("  ".to_string());
    c.address = Some(" 12 Main ".to_string());

    let set = resolve(&[c], &no_locations(), &no_visits(), &no_reports());

    let identity = set.get("shop").unwrap();
    assert_eq!(identity.phone, None);
    assert_eq!(identity.address.as_deref(), Some("12 Main"));
}

// -----------------------------------------------------------------------
// identifiers
// -----------------------------------------------------------------------

#[test]
fn visit_identities_get_synthetic_ids() {
    let set = resolve(
        &no_customers(),
        &no_locations(),
        &[visit(" Corner Shop", 1)],
        &no_reports(),
    );
    let identity = set.get("corner shop").unwrap();
    assert_eq!(identity.id.as_str(), "adhoc-corner%20shop");
    assert_eq!(identity.display_name, "Corner Shop");
}

#[test]
fn report_identities_reuse_location_uuid_when_valid() {
    let uuid = Uuid::new_v4();
    let mut with_uuid = report("Alpha", 1);
    with_uuid.location_id = Some(uuid.to_string());
    let mut with_text = report("Beta", 1);
    with_text.location_id = Some("legacy-7".to_string());

    let set = resolve(
        &no_customers(),
        &no_locations(),
        &no_visits(),
        &[with_uuid, with_text],
    );

    assert_eq!(set.get("alpha").unwrap().id.as_str(), uuid.to_string());
    assert_eq!(set.get("beta").unwrap().id.as_str(), "report-beta");
}

#[test]
fn reports_sharing_a_location_uuid_get_distinct_ids() {
    let uuid = Uuid::new_v4();
    let mut first = report("Bakery", 2);
    first.location_id = Some(uuid.to_string());
    let mut second = report("Bakery Lane", 1);
    second.location_id = Some(uuid.to_string());

    let set = resolve(&no_customers(), &no_locations(), &no_visits(), &[first, second]);

    assert_eq!(set.get("bakery").unwrap().id.as_str(), uuid.to_string());
    assert_eq!(
        set.get("bakery lane").unwrap().id.as_str(),
        "report-bakery%20lane"
    );
}

#[test]
fn report_uuid_taken_by_schedule_location_falls_back() {
    let loc = location("Central Pharmacy");
    let mut typed = report("Central Pharm", 1);
    typed.location_id = Some(loc.id.to_string());

    let set = resolve(&no_customers(), &[loc.clone()], &no_visits(), &[typed]);

    assert_eq!(set.len(), 2);
    assert_eq!(
        set.get("central pharmacy").unwrap().id.parse(),
        CustomerRef::Row(loc.id)
    );
    assert_eq!(
        set.get("central pharm").unwrap().id.as_str(),
        "report-central%20pharm"
    );
}

#[test]
fn visit_seeds_do_not_carry_coordinates() {
    let mut v = visit("Shop", 1);
    v.latitude = Some(35.7);
    v.longitude = Some(51.4);

    let set = resolve(&no_customers(), &no_locations(), &[v], &no_reports());

    assert_eq!(set.get("shop").unwrap().coordinates, None);
}

#[test]
fn customer_coordinates_need_both_halves() {
    let mut half = customer("Half");
    half.latitude = Some(35.7);
    let mut full = customer("Full");
    full.latitude = Some(35.7);
    full.longitude = Some(51.4);
    full.is_vip = true;

    let set = resolve(&[half, full], &no_locations(), &no_visits(), &no_reports());

    assert_eq!(set.get("half").unwrap().coordinates, None);
    let full = set.get("full").unwrap();
    assert_eq!(
        full.coordinates,
        Some(Coordinates {
            latitude: 35.7,
            longitude: 51.4
        })
    );
    assert!(full.is_vip);
}
