//! Customer list and detail commands.
//!
//! Both commands load one visitor's snapshot through [`PgSource`], reconcile
//! it in memory and print the result. Nothing is written back.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use fieldvisit_db::{fetch_snapshot, fetch_snapshot_allow_degraded, PgSource};
use fieldvisit_reconcile::{
    build_customer_list, customer_detail, filter_timeline, query, totals, CustomerDetail,
    CustomerId, CustomerIdentity, OrderFilter, QueryOptions, SortField, SortOrder, TimelineEntry,
};
use uuid::Uuid;

const NAME_WIDTH: usize = 32;

#[derive(Debug)]
pub(crate) struct ListArgs {
    pub owner: Uuid,
    pub search: String,
    pub sort: String,
    pub order: String,
    pub allow_degraded: bool,
}

pub(crate) fn query_options(args: &ListArgs) -> anyhow::Result<QueryOptions> {
    Ok(QueryOptions {
        search_text: args.search.clone(),
        sort_field: args.sort.parse::<SortField>().context("invalid --sort")?,
        sort_order: args.order.parse::<SortOrder>().context("invalid --order")?,
    })
}

/// Format an optional timestamp for display; `None` renders as a dash.
pub(crate) fn fmt_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "\u{2014}".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub(crate) fn fmt_name(name: &str) -> String {
    if name.chars().count() > NAME_WIDTH {
        let head: String = name.chars().take(NAME_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

fn print_row(identity: &CustomerIdentity) {
    let rollup = &identity.rollup;
    println!(
        "{:<34}{:>7}{:>8}{:>6}%  {:<18}{}",
        fmt_name(&identity.display_name),
        rollup.total_visits,
        rollup.total_orders,
        rollup.conversion_percent,
        fmt_timestamp(rollup.last_visit_at),
        identity.id
    );
}

/// List reconciled customers for one visitor.
///
/// With `allow_degraded`, streams that fail to load are replaced by empty
/// ones and named on stderr before the table is printed.
///
/// # Errors
///
/// Returns an error if the sort arguments are invalid or, without
/// `allow_degraded`, if any stream fails to load.
pub(crate) async fn run_list(
    pool: sqlx::PgPool,
    args: &ListArgs,
    fetch_timeout: Duration,
) -> anyhow::Result<()> {
    let options = query_options(args)?;
    let source = PgSource::new(pool);

    let snapshot = if args.allow_degraded {
        let degraded = fetch_snapshot_allow_degraded(&source, args.owner, fetch_timeout).await;
        if !degraded.is_complete() {
            let missing = degraded
                .missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            eprintln!("warning: incomplete data, substituted empty streams: {missing}");
        }
        degraded.snapshot
    } else {
        fetch_snapshot(&source, args.owner, fetch_timeout).await?
    };

    let set = build_customer_list(&snapshot);
    let rows = query(set.as_slice(), &options);

    if rows.is_empty() {
        println!("no customers found for visitor {}", args.owner);
        return Ok(());
    }

    println!(
        "{:<34}{:>7}{:>8}{:>7}  {:<18}ID",
        "NAME", "VISITS", "ORDERS", "CONV", "LAST VISIT"
    );
    for identity in &rows {
        print_row(identity);
    }

    let summary = totals(rows.iter().copied());
    println!();
    println!(
        "{} customer(s), {} visit(s), {} order(s), {}% conversion",
        summary.total_customers,
        summary.total_visits,
        summary.total_orders,
        summary.conversion_percent
    );

    Ok(())
}

fn print_timeline(entries: &[TimelineEntry]) {
    if entries.is_empty() {
        println!("no visits recorded");
        return;
    }
    println!("{:<18}{:<17}{:<7}NOTE", "DATE", "KIND", "ORDER");
    for entry in entries {
        println!(
            "{:<18}{:<17}{:<7}{}",
            fmt_timestamp(entry.timestamp),
            entry.kind.to_string(),
            if entry.has_order { "yes" } else { "no" },
            entry.description.as_deref().unwrap_or("")
        );
    }
}

/// Show one customer and its visit history.
///
/// # Errors
///
/// Returns an error if `orders` is not a known filter, the fetch fails, or
/// no customer matches `id`.
pub(crate) async fn run_show(
    pool: sqlx::PgPool,
    owner: Uuid,
    id: &str,
    orders: &str,
    json: bool,
    fetch_timeout: Duration,
) -> anyhow::Result<()> {
    let filter = orders.parse::<OrderFilter>().context("invalid --orders")?;
    let source = PgSource::new(pool);
    let snapshot = fetch_snapshot(&source, owner, fetch_timeout).await?;

    let detail = customer_detail(&snapshot, &CustomerId::from_raw(id))
        .ok_or_else(|| anyhow::anyhow!("customer '{id}' not found for visitor {owner}"))?;
    let detail = CustomerDetail {
        timeline: filter_timeline(&detail.timeline, filter),
        identity: detail.identity,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let identity = &detail.identity;
    println!("{} ({})", identity.display_name, identity.id);
    println!("Phone: {}", identity.phone.as_deref().unwrap_or("\u{2014}"));
    println!(
        "Address: {}",
        identity.address.as_deref().unwrap_or("\u{2014}")
    );
    println!(
        "Store type: {}",
        identity.store_type.as_deref().unwrap_or("unknown")
    );
    println!(
        "Visits: {}  Orders: {}  Conversion: {}%",
        identity.rollup.total_visits,
        identity.rollup.total_orders,
        identity.rollup.conversion_percent
    );
    if let Some(note) = identity.rollup.last_note.as_deref() {
        println!("Last note: {note}");
    }
    println!();
    print_timeline(&detail.timeline);

    Ok(())
}
