use actix_web::HttpResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Not enough product with id {product_id} ({available}/{requested})")]
    InsufficientStock {
        product_id: i32,
        available: i32,
        requested: i32,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn product_not_found(id: i32) -> Self {
        AppError::NotFound(format!("Can't find product with id {id}"))
    }

    pub fn order_not_found(id: i32) -> Self {
        AppError::NotFound(format!("Can't find order with id {id}"))
    }
}

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::InsufficientStock { .. } => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": self.to_string()
                }))
            }
            AppError::Internal(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            })),
        }
    }
}
