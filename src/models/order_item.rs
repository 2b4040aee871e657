use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::order_items;

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable,
    Associations,
)]
#[diesel(table_name = order_items)]
#[diesel(primary_key(order_item_id))]
#[diesel(belongs_to(crate::models::order::Order, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItem {
    pub order_item_id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
}
