use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::response::{success, ApiError, ApiJson};
use super::AppState;
use crate::checkout::PlaceOrderRequest;
use crate::domain::OrderStatus;
use crate::store::OrderQuery;

/// `POST /api/orders`: public checkout.
pub async fn create_order(State(s): State<AppState>, ApiJson(request): ApiJson<PlaceOrderRequest>) -> Result<Json<Value>, ApiError> {
    let placed = s.checkout.place_order(request).await?;
    Ok(success(placed.order))
}

/// Query parameters arrive as raw strings; malformed numbers fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    fn new(query: &OrderQuery, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(query.page_size));
        Self {
            current_page: query.page,
            page_size: query.page_size,
            total,
            total_pages,
            has_next_page: u64::from(query.page) < total_pages,
            has_previous_page: query.page > 1,
        }
    }
}

/// `GET /api/orders`: admin listing.
pub async fn list_orders(
    State(s): State<AppState>,
    headers: HeaderMap,
    Query(p): Query<ListOrdersParams>,
) -> Result<Json<Value>, ApiError> {
    s.admin.authorize(&headers)?;

    let status = match p.status.as_deref().filter(|v| !v.is_empty()) {
        Some(raw) => Some(raw.parse::<OrderStatus>().map_err(|e| ApiError::BadRequest(e.to_string()))?),
        None => None,
    };
    let parse = |v: Option<String>| v.and_then(|v| v.trim().parse::<i64>().ok());
    let query = OrderQuery::new(parse(p.page), parse(p.limit), status);

    let page = s
        .checkout
        .store()
        .list_orders(&query)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch orders", e))?;

    Ok(Json(json!({
        "success": true,
        "data": page.orders,
        "pagination": Pagination::new(&query, page.total),
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderDetailParams {
    pub token: Option<String>,
}

/// `GET /api/orders/:id`: readable by admins or by the holder of the order's signed link.
pub async fn get_order(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(p): Query<OrderDetailParams>,
) -> Result<Json<Value>, ApiError> {
    let is_admin = s.admin.is_admin(&headers);
    if !is_admin && p.token.is_none() {
        return Err(ApiError::Unauthorized);
    }
    let Ok(id) = id.parse::<i64>() else { return Err(ApiError::NotFound) };

    let order = s
        .checkout
        .store()
        .find_order(id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch order", e))?
        .ok_or(ApiError::NotFound)?;

    let token_ok = p.token.as_deref().is_some_and(|t| s.checkout.links().verify(order.id, &order.order_number, t));
    if !is_admin && !token_ok {
        return Err(ApiError::Unauthorized);
    }
    Ok(success(order))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_metadata() {
        let p = Pagination::new(&OrderQuery::new(Some(2), Some(20), None), 45);
        assert_eq!(p, Pagination { current_page: 2, page_size: 20, total: 45, total_pages: 3, has_next_page: true, has_previous_page: true });
        let p = Pagination::new(&OrderQuery::default(), 0);
        assert_eq!((p.total_pages, p.has_next_page, p.has_previous_page), (0, false, false));
    }
}
