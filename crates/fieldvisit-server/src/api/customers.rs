use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use fieldvisit_db::{fetch_snapshot, FieldDataSource};
use fieldvisit_reconcile::{
    build_customer_list, customer_detail, customer_navigation_url, filter_timeline, query, totals,
    CustomerId, CustomerIdentity, NavPlatform, OrderFilter, QueryOptions, SortField, SortOrder,
    TimelineEntry, Totals,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_fetch_error, parse_or_default, require_owner, ApiError, ApiResponse, AppState, ErrorCode,
    ResponseMeta,
};

#[derive(Debug, Default, Deserialize)]
pub(super) struct CustomerListParams {
    pub owner_id: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CustomerDetailParams {
    pub owner_id: Option<String>,
    pub orders: Option<String>,
    pub platform: Option<String>,
}

/// A reconciled customer plus a ready-to-open directions link.
#[derive(Debug, Serialize)]
pub(super) struct CustomerItem {
    #[serde(flatten)]
    pub identity: CustomerIdentity,
    pub navigation_url: String,
}

impl CustomerItem {
    fn new(identity: CustomerIdentity, platform: NavPlatform) -> Self {
        let navigation_url = customer_navigation_url(platform, &identity);
        Self {
            identity,
            navigation_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CustomerDetailItem {
    pub customer: CustomerItem,
    pub timeline: Vec<TimelineEntry>,
}

fn list_options(req_id: &str, params: &CustomerListParams) -> Result<QueryOptions, ApiError> {
    Ok(QueryOptions {
        search_text: params.q.clone().unwrap_or_default(),
        sort_field: parse_or_default::<SortField>(req_id, "sort", params.sort.as_deref())?,
        sort_order: parse_or_default::<SortOrder>(req_id, "order", params.order.as_deref())?,
    })
}

pub(super) async fn list_customers<S: FieldDataSource + 'static>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<ApiResponse<Vec<CustomerItem>>>, ApiError> {
    let owner = require_owner(&req_id.0, params.owner_id.as_deref())?;
    let options = list_options(&req_id.0, &params)?;
    let platform =
        parse_or_default::<NavPlatform>(&req_id.0, "platform", params.platform.as_deref())?;

    let snapshot = fetch_snapshot(state.source.as_ref(), owner, state.fetch_timeout)
        .await
        .map_err(|e| map_fetch_error(req_id.0.clone(), &e))?;
    let set = build_customer_list(&snapshot);

    let data = query(set.as_slice(), &options)
        .into_iter()
        .map(|identity| CustomerItem::new(identity.clone(), platform))
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Totals over the same filtered list `list_customers` would return.
pub(super) async fn customer_totals<S: FieldDataSource + 'static>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<ApiResponse<Totals>>, ApiError> {
    let owner = require_owner(&req_id.0, params.owner_id.as_deref())?;
    let options = list_options(&req_id.0, &params)?;

    let snapshot = fetch_snapshot(state.source.as_ref(), owner, state.fetch_timeout)
        .await
        .map_err(|e| map_fetch_error(req_id.0.clone(), &e))?;
    let set = build_customer_list(&snapshot);
    let data = totals(query(set.as_slice(), &options));

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_customer<S: FieldDataSource + 'static>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Query(params): Query<CustomerDetailParams>,
) -> Result<Json<ApiResponse<CustomerDetailItem>>, ApiError> {
    let owner = require_owner(&req_id.0, params.owner_id.as_deref())?;
    let filter = parse_or_default::<OrderFilter>(&req_id.0, "orders", params.orders.as_deref())?;
    let platform =
        parse_or_default::<NavPlatform>(&req_id.0, "platform", params.platform.as_deref())?;

    let snapshot = fetch_snapshot(state.source.as_ref(), owner, state.fetch_timeout)
        .await
        .map_err(|e| map_fetch_error(req_id.0.clone(), &e))?;

    let Some(detail) = customer_detail(&snapshot, &CustomerId::from_raw(id.as_str())) else {
        return Err(ApiError::new(
            req_id.0,
            ErrorCode::NotFound,
            format!("customer {id} not found"),
        ));
    };

    let data = CustomerDetailItem {
        timeline: filter_timeline(&detail.timeline, filter),
        customer: CustomerItem::new(detail.identity, platform),
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
