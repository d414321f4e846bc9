use serde::{Deserialize, Serialize};

use crate::aggregate::conversion_percent;
use crate::identity::CustomerIdentity;

/// Headline numbers over a customer list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_customers: usize,
    pub total_visits: u32,
    pub total_orders: u32,
    pub conversion_percent: u8,
}

#[must_use]
pub fn totals<'a>(rows: impl IntoIterator<Item = &'a CustomerIdentity>) -> Totals {
    let mut out = Totals::default();
    for row in rows {
        out.total_customers += 1;
        out.total_visits = out.total_visits.saturating_add(row.rollup.total_visits);
        out.total_orders = out.total_orders.saturating_add(row.rollup.total_orders);
    }
    out.conversion_percent = conversion_percent(out.total_orders, out.total_visits);
    out
}
