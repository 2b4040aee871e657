use actix_web::{web, HttpResponse};
use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::{Product, ProductPatch};
use crate::store::CatalogStore;

use super::ListParams;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub product_id: i32,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub quantity: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            product_id: p.product_id,
            name: p.name,
            description: p.description,
            price: p.price.to_f64().unwrap_or_default(),
            quantity: p.quantity,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IdResponse {
    pub id: i32,
}

fn to_decimal(price: f64) -> Result<BigDecimal, AppError> {
    BigDecimal::from_f64(price).ok_or_else(|| AppError::Internal(format!("Invalid price {price}")))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = IdResponse),
        (status = 422, description = "Invalid request body"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn create_product(
    store: web::Data<CatalogStore>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let price = to_decimal(body.price)?;

    let product = web::block(move || store.create(body.name, body.description, price, body.quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(json!({ "id": product.product_id })))
}

/// GET /products
#[utoipa::path(
    get,
    path = "/products",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum number of products to return (default: no truncation)"),
        ("offset" = Option<i64>, Query, description = "Number of products to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "Products in insertion order", body = [ProductResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn list_products(
    store: web::Data<CatalogStore>,
    query: web::Query<ListParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();

    let products = web::block(move || store.list(params.limit, params.offset))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let items: Vec<ProductResponse> = products.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product id"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn get_product(
    store: web::Data<CatalogStore>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let product = web::block(move || store.get(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// PUT /products/{id}
///
/// Sparse update: only the fields present in the body are changed; absent
/// fields keep their stored values.
#[utoipa::path(
    put,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product id"),
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Invalid request body"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn update_product(
    store: web::Data<CatalogStore>,
    path: web::Path<i32>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();

    let patch = ProductPatch {
        name: body.name,
        description: body.description,
        price: body.price.map(to_decimal).transpose()?,
        quantity: body.quantity,
    };

    let product = web::block(move || store.update(id, patch))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// DELETE /products/{id}
#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product id"),
    ),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn delete_product(
    store: web::Data<CatalogStore>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    web::block(move || store.delete(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::NoContent().finish())
}
