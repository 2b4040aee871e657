use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::{Order, OrderView};
use crate::store::OrderEngine;

use super::ListParams;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    /// Free-text status; the engine enforces no vocabulary.
    #[serde(default = "default_status")]
    pub status: String,
    /// Requested quantity per product id.
    pub items: BTreeMap<i32, i32>,
}

fn default_status() -> String {
    "created".to_string()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: i32,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        OrderResponse {
            order_id: o.order_id,
            status: o.status,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderViewResponse {
    pub order_id: i32,
    pub status: String,
    /// Reserved quantity per *current* product name.
    pub order_items: BTreeMap<String, i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<OrderView> for OrderViewResponse {
    fn from(v: OrderView) -> Self {
        OrderViewResponse {
            order_id: v.order_id,
            status: v.status,
            order_items: v.order_items,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusParams {
    pub order_status: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Places an order. The order row, every stock decrement and every order
/// item are committed in one transaction; any failure rolls the whole
/// operation back.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order created", body = crate::handlers::products::IdResponse),
        (status = 400, description = "Not enough product to create order"),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Invalid request body"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    engine: web::Data<OrderEngine>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let order = web::block(move || engine.place_order(body.status, body.items))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(json!({ "id": order.order_id })))
}

/// GET /orders
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum number of orders to return (default: no truncation)"),
        ("offset" = Option<i64>, Query, description = "Number of orders to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "Order views in insertion order", body = [OrderViewResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    engine: web::Data<OrderEngine>,
    query: web::Query<ListParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();

    let views = web::block(move || engine.list_orders(params.limit, params.offset))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let items: Vec<OrderViewResponse> = views.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = i32, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderViewResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    engine: web::Data<OrderEngine>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let view = web::block(move || engine.get_order(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderViewResponse::from(view)))
}

/// PATCH /orders/{id}/status?order_status=
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(
        ("id" = i32, Path, description = "Order id"),
        ("order_status" = String, Query, description = "New status (free text)"),
    ),
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn set_order_status(
    engine: web::Data<OrderEngine>,
    path: web::Path<i32>,
    query: web::Query<StatusParams>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let status = query.into_inner().order_status;

    let order = web::block(move || engine.set_status(id, status))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
