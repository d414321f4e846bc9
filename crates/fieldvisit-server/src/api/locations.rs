use axum::{
    extract::{Query, State},
    Extension, Json,
};
use fieldvisit_core::RawLocation;
use fieldvisit_db::FieldDataSource;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Default, Deserialize)]
pub(super) struct LocationSearchParams {
    pub q: Option<String>,
}

pub(super) async fn search_locations<S: FieldDataSource + 'static>(
    State(state): State<AppState<S>>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<LocationSearchParams>,
) -> Result<Json<ApiResponse<Vec<RawLocation>>>, ApiError> {
    let Some(needle) = params.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(ApiError::validation(&req_id.0, "q is required"));
    };

    let data = state
        .source
        .locations_by_name(needle)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
