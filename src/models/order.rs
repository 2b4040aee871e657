use std::collections::BTreeMap;

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::orders;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(primary_key(order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order {
    pub order_id: i32,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Denormalized read-model of an order: item product ids resolved to the
/// products' *current* names.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub order_id: i32,
    pub status: String,
    pub order_items: BTreeMap<String, i32>,
    pub created_at: String,
    pub updated_at: String,
}
