pub mod orders;
pub mod products;

use serde::Deserialize;
use utoipa::ToSchema;

/// Shared `?limit&offset` query parameters for the list endpoints.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListParams {
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}
