use std::collections::{BTreeMap, HashMap};

use diesel::prelude::*;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::{NewOrder, NewOrderItem, Order, OrderView, Product};
use crate::schema::{order_items, orders, products};

use super::now_iso;

/// Order engine: the place-order transaction plus denormalized order views.
pub struct OrderEngine {
    pool: DbPool,
}

impl OrderEngine {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Atomically create an order and reserve stock for every requested item.
    ///
    /// The order row, every stock decrement and every order_items row commit
    /// together or not at all. Each product is read with `FOR UPDATE` so two
    /// concurrent orders cannot both pass the stock check and drive
    /// `quantity` negative.
    pub fn place_order(
        &self,
        status: String,
        items: BTreeMap<i32, i32>,
    ) -> Result<Order, AppError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let now = now_iso();
            let order: Order = diesel::insert_into(orders::table)
                .values(&NewOrder {
                    status,
                    created_at: now.clone(),
                    updated_at: now,
                })
                .get_result(conn)?;

            for (&product_id, &requested) in &items {
                let product = products::table
                    .find(product_id)
                    .select(Product::as_select())
                    .for_update()
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| AppError::product_not_found(product_id))?;

                if product.quantity < requested {
                    return Err(AppError::InsufficientStock {
                        product_id,
                        available: product.quantity,
                        requested,
                    });
                }

                diesel::update(products::table.find(product_id))
                    .set(products::quantity.eq(product.quantity - requested))
                    .execute(conn)?;

                // The reserved quantity is frozen here; later stock changes
                // never touch it.
                diesel::insert_into(order_items::table)
                    .values(&NewOrderItem {
                        order_id: order.order_id,
                        product_id,
                        quantity: requested,
                    })
                    .execute(conn)?;
            }

            Ok(order)
        })
    }

    /// Orders in insertion (id) order with their item views, sliced like
    /// [`CatalogStore::list`](crate::store::CatalogStore::list).
    ///
    /// Product names are resolved by a live join: renaming a product changes
    /// what historical views show. Items whose product has since been deleted
    /// drop out of the view entirely.
    pub fn list_orders(&self, limit: Option<i64>, offset: i64) -> Result<Vec<OrderView>, AppError> {
        let mut conn = self.pool.get()?;

        let mut query = orders::table
            .select(Order::as_select())
            .order(orders::order_id.asc())
            .into_boxed()
            .offset(offset.max(0));
        if let Some(limit) = limit {
            query = query.limit(limit.max(0));
        }
        let order_rows: Vec<Order> = query.load(&mut conn)?;

        let ids: Vec<i32> = order_rows.iter().map(|o| o.order_id).collect();
        let item_rows: Vec<(i32, String, i32)> = order_items::table
            .inner_join(products::table)
            .filter(order_items::order_id.eq_any(&ids))
            .order(order_items::order_item_id.asc())
            .select((order_items::order_id, products::name, order_items::quantity))
            .load(&mut conn)?;

        let mut items_by_order: HashMap<i32, Vec<(String, i32)>> = HashMap::new();
        for (order_id, name, quantity) in item_rows {
            items_by_order
                .entry(order_id)
                .or_default()
                .push((name, quantity));
        }

        Ok(order_rows
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.order_id).unwrap_or_default();
                order_view(order, items)
            })
            .collect())
    }

    pub fn get_order(&self, id: i32) -> Result<OrderView, AppError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .find(id)
            .select(Order::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::order_not_found(id))?;

        let items: Vec<(String, i32)> = order_items::table
            .inner_join(products::table)
            .filter(order_items::order_id.eq(id))
            .order(order_items::order_item_id.asc())
            .select((products::name, order_items::quantity))
            .load(&mut conn)?;

        Ok(order_view(order, items))
    }

    /// Overwrites `status` (any string is accepted; no transition graph) and
    /// refreshes `updated_at`.
    pub fn set_status(&self, id: i32, status: String) -> Result<Order, AppError> {
        let mut conn = self.pool.get()?;

        diesel::update(orders::table.find(id))
            .set((orders::status.eq(status), orders::updated_at.eq(now_iso())))
            .get_result::<Order>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::order_not_found(id))
    }
}

/// Fold `(product name, quantity)` pairs into the order's view map. Two items
/// resolving to the same name collapse; the later item (by order_item_id)
/// wins.
fn order_view(order: Order, items: impl IntoIterator<Item = (String, i32)>) -> OrderView {
    let mut order_items = BTreeMap::new();
    for (name, quantity) in items {
        order_items.insert(name, quantity);
    }
    OrderView {
        order_id: order.order_id,
        status: order.status,
        order_items,
        created_at: order.created_at,
        updated_at: order.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::{order_view, OrderEngine};
    use crate::errors::AppError;
    use crate::models::{Order, Product};
    use crate::store::CatalogStore;
    use crate::testutil::setup_db;

    // ── order_view (pure) ────────────────────────────────────────────────────

    fn scalar_order() -> Order {
        Order {
            order_id: 12,
            status: "created".into(),
            created_at: "2024-09-20T12:00:00.000000".into(),
            updated_at: "2024-09-20T12:00:00.000000".into(),
        }
    }

    #[test]
    fn order_view_carries_scalar_fields() {
        let view = order_view(scalar_order(), vec![("Widget".to_string(), 2)]);
        assert_eq!(view.order_id, 12);
        assert_eq!(view.status, "created");
        assert_eq!(view.created_at, "2024-09-20T12:00:00.000000");
        assert_eq!(view.order_items, BTreeMap::from([("Widget".to_string(), 2)]));
    }

    #[test]
    fn order_view_with_no_items_is_empty() {
        let view = order_view(scalar_order(), vec![]);
        assert!(view.order_items.is_empty());
    }

    #[test]
    fn order_view_collapses_duplicate_names_later_wins() {
        let view = order_view(
            scalar_order(),
            vec![("Widget".to_string(), 2), ("Widget".to_string(), 5)],
        );
        assert_eq!(view.order_items, BTreeMap::from([("Widget".to_string(), 5)]));
    }

    // ── OrderEngine (Postgres-backed) ────────────────────────────────────────

    fn price(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn seed_two_products(catalog: &CatalogStore) -> (Product, Product) {
        let a = catalog
            .create("First product".into(), String::new(), price("12.3"), 12)
            .expect("create failed");
        let b = catalog
            .create("Second product".into(), String::new(), price("32.1"), 1)
            .expect("create failed");
        (a, b)
    }

    #[tokio::test]
    async fn place_order_decrements_stock_and_freezes_item_quantities() {
        let (_container, pool) = setup_db().await;
        let catalog = CatalogStore::new(pool.clone());
        let engine = OrderEngine::new(pool);
        let (a, b) = seed_two_products(&catalog);

        let order = engine
            .place_order(
                "created".into(),
                BTreeMap::from([(a.product_id, 10), (b.product_id, 1)]),
            )
            .expect("place_order failed");

        assert_eq!(catalog.get(a.product_id).unwrap().quantity, 2);
        assert_eq!(catalog.get(b.product_id).unwrap().quantity, 0);

        let view = engine.get_order(order.order_id).expect("get_order failed");
        assert_eq!(order.status, "created");
        assert_eq!(
            view.order_items,
            BTreeMap::from([("First product".to_string(), 10), ("Second product".to_string(), 1)])
        );
    }

    #[tokio::test]
    async fn place_order_insufficient_stock_rolls_everything_back() {
        let (_container, pool) = setup_db().await;
        let catalog = CatalogStore::new(pool.clone());
        let engine = OrderEngine::new(pool);
        let (a, b) = seed_two_products(&catalog);

        let err = engine
            .place_order(
                "created".into(),
                BTreeMap::from([(a.product_id, 10), (b.product_id, 5)]),
            )
            .expect_err("place_order should fail");

        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert_eq!(
            err.to_string(),
            format!("Not enough product with id {} (1/5)", b.product_id)
        );
        // Product a was checked first but its decrement must not survive.
        assert_eq!(catalog.get(a.product_id).unwrap().quantity, 12);
        assert_eq!(catalog.get(b.product_id).unwrap().quantity, 1);
        assert!(engine.list_orders(None, 0).expect("list failed").is_empty());
    }

    #[tokio::test]
    async fn place_order_unknown_product_rolls_everything_back() {
        let (_container, pool) = setup_db().await;
        let catalog = CatalogStore::new(pool.clone());
        let engine = OrderEngine::new(pool);
        let (a, _) = seed_two_products(&catalog);

        let err = engine
            .place_order(
                "created".into(),
                BTreeMap::from([(a.product_id, 1), (999, 1)]),
            )
            .expect_err("place_order should fail");

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Can't find product with id 999");
        assert_eq!(catalog.get(a.product_id).unwrap().quantity, 12);
        assert!(engine.list_orders(None, 0).expect("list failed").is_empty());
    }

    #[tokio::test]
    async fn get_order_unknown_id_is_not_found() {
        let (_container, pool) = setup_db().await;
        let engine = OrderEngine::new(pool);

        let err = engine.get_order(999).expect_err("get_order should fail");
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Can't find order with id 999");
    }

    #[tokio::test]
    async fn get_order_is_idempotent() {
        let (_container, pool) = setup_db().await;
        let catalog = CatalogStore::new(pool.clone());
        let engine = OrderEngine::new(pool);
        let (a, _) = seed_two_products(&catalog);

        let order = engine
            .place_order("created".into(), BTreeMap::from([(a.product_id, 2)]))
            .expect("place_order failed");

        let first = engine.get_order(order.order_id).expect("get_order failed");
        let second = engine.get_order(order.order_id).expect("get_order failed");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn set_status_overwrites_status_and_refreshes_updated_at() {
        let (_container, pool) = setup_db().await;
        let catalog = CatalogStore::new(pool.clone());
        let engine = OrderEngine::new(pool);
        let (a, _) = seed_two_products(&catalog);

        let order = engine
            .place_order("created".into(), BTreeMap::from([(a.product_id, 1)]))
            .expect("place_order failed");
        std::thread::sleep(std::time::Duration::from_millis(2));

        let updated = engine
            .set_status(order.order_id, "Shipped".into())
            .expect("set_status failed");

        assert_eq!(updated.status, "Shipped");
        assert!(updated.updated_at > order.created_at);

        let view = engine.get_order(order.order_id).expect("get_order failed");
        assert_eq!(view.status, "Shipped");
    }

    #[tokio::test]
    async fn set_status_unknown_id_is_not_found() {
        let (_container, pool) = setup_db().await;
        let engine = OrderEngine::new(pool);

        let err = engine
            .set_status(999, "Shipped".into())
            .expect_err("set_status should fail");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn order_views_resolve_current_product_names() {
        let (_container, pool) = setup_db().await;
        let catalog = CatalogStore::new(pool.clone());
        let engine = OrderEngine::new(pool);
        let (a, _) = seed_two_products(&catalog);

        let order = engine
            .place_order("created".into(), BTreeMap::from([(a.product_id, 3)]))
            .expect("place_order failed");

        catalog
            .update(
                a.product_id,
                crate::models::ProductPatch {
                    name: Some("Renamed product".into()),
                    ..Default::default()
                },
            )
            .expect("update failed");

        let view = engine.get_order(order.order_id).expect("get_order failed");
        assert_eq!(
            view.order_items,
            BTreeMap::from([("Renamed product".to_string(), 3)])
        );
    }

    #[tokio::test]
    async fn order_views_omit_items_whose_product_was_deleted() {
        let (_container, pool) = setup_db().await;
        let catalog = CatalogStore::new(pool.clone());
        let engine = OrderEngine::new(pool);
        let (a, b) = seed_two_products(&catalog);

        let order = engine
            .place_order(
                "created".into(),
                BTreeMap::from([(a.product_id, 1), (b.product_id, 1)]),
            )
            .expect("place_order failed");

        catalog.delete(b.product_id).expect("delete failed");

        let view = engine.get_order(order.order_id).expect("get_order failed");
        assert_eq!(
            view.order_items,
            BTreeMap::from([("First product".to_string(), 1)])
        );
    }

    #[tokio::test]
    async fn list_orders_paginates_in_insertion_order() {
        let (_container, pool) = setup_db().await;
        let catalog = CatalogStore::new(pool.clone());
        let engine = OrderEngine::new(pool);
        let (a, _) = seed_two_products(&catalog);

        for i in 0..4 {
            engine
                .place_order(format!("order {i}"), BTreeMap::from([(a.product_id, 1)]))
                .expect("place_order failed");
        }

        let all = engine.list_orders(None, 0).expect("list failed");
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].order_id < w[1].order_id));

        let page = engine.list_orders(Some(2), 1).expect("list failed");
        assert_eq!(page, all[1..3].to_vec());

        let beyond = engine.list_orders(Some(2), 100).expect("list failed");
        assert!(beyond.is_empty());
    }
}
