use bigdecimal::BigDecimal;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::products;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(primary_key(product_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub product_id: i32,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// Sparse update: `None` fields are left untouched by Diesel's changeset,
/// so a PUT carrying only `price` never clobbers `name` or `quantity`.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub quantity: Option<i32>,
}
