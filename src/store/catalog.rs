use bigdecimal::BigDecimal;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::{NewProduct, Product, ProductPatch};
use crate::schema::products;

use super::now_iso;

/// Product catalog: single-row persistence over the `products` table.
pub struct CatalogStore {
    pool: DbPool,
}

impl CatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(
        &self,
        name: String,
        description: String,
        price: BigDecimal,
        quantity: i32,
    ) -> Result<Product, AppError> {
        let mut conn = self.pool.get()?;

        let now = now_iso();
        let product = diesel::insert_into(products::table)
            .values(&NewProduct {
                name,
                description,
                price,
                quantity,
                created_at: now.clone(),
                updated_at: now,
            })
            .get_result(&mut conn)?;

        Ok(product)
    }

    /// Products in insertion (id) order, sliced as `[offset, offset + limit)`.
    /// Without a limit, everything from `offset` onward is returned.
    pub fn list(&self, limit: Option<i64>, offset: i64) -> Result<Vec<Product>, AppError> {
        let mut conn = self.pool.get()?;

        let mut query = products::table
            .select(Product::as_select())
            .order(products::product_id.asc())
            .into_boxed()
            .offset(offset.max(0));
        if let Some(limit) = limit {
            query = query.limit(limit.max(0));
        }

        Ok(query.load(&mut conn)?)
    }

    pub fn get(&self, id: i32) -> Result<Product, AppError> {
        let mut conn = self.pool.get()?;

        products::table
            .find(id)
            .select(Product::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::product_not_found(id))
    }

    /// Applies only the fields present in `patch`; `updated_at` is always
    /// refreshed.
    pub fn update(&self, id: i32, patch: ProductPatch) -> Result<Product, AppError> {
        let mut conn = self.pool.get()?;

        diesel::update(products::table.find(id))
            .set((patch, products::updated_at.eq(now_iso())))
            .get_result::<Product>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::product_not_found(id))
    }

    pub fn delete(&self, id: i32) -> Result<(), AppError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(AppError::product_not_found(id));
        }
        Ok(())
    }
}
