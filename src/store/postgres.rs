use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{ProductStore, StoreError};
use crate::models::{NewProduct, Product, ProductFilter};

const INSERT_PRODUCT: &str = r#"
    INSERT INTO products (name, description, price, stock, category)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, name, description, price, stock, category, created_at, updated_at
"#;

const SELECT_PRODUCT: &str = r#"
    SELECT id, name, description, price, stock, category, created_at, updated_at
    FROM products
    WHERE id = $1
"#;

const SELECT_PRODUCTS: &str = r#"
    SELECT id, name, description, price, stock, category, created_at, updated_at
    FROM products
    ORDER BY id
"#;

const SELECT_PRODUCTS_BY_CATEGORY: &str = r#"
    SELECT id, name, description, price, stock, category, created_at, updated_at
    FROM products
    WHERE category = $1
    ORDER BY id
"#;

const UPDATE_PRODUCT: &str = r#"
    UPDATE products
    SET name = $1, description = $2, price = $3, stock = $4, category = $5, updated_at = NOW()
    WHERE id = $6
    RETURNING id, name, description, price, stock, category, created_at, updated_at
"#;

const DELETE_PRODUCT: &str = "DELETE FROM products WHERE id = $1";

/// 商品存储的 Postgres 实现
pub struct PgProductStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgProductStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// 每条语句都受配置的超时约束
    async fn bounded<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let created = self
            .bounded(
                sqlx::query_as::<_, Product>(INSERT_PRODUCT)
                    .bind(&product.name)
                    .bind(&product.description)
                    .bind(product.price)
                    .bind(product.stock)
                    .bind(&product.category)
                    .fetch_one(&self.pool),
            )
            .await?;

        tracing::debug!("Inserted product {}", created.id);
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, Product>(SELECT_PRODUCT)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        match filter.category() {
            Some(category) => {
                self.bounded(
                    sqlx::query_as::<_, Product>(SELECT_PRODUCTS_BY_CATEGORY)
                        .bind(category)
                        .fetch_all(&self.pool),
                )
                .await
            }
            None => {
                self.bounded(sqlx::query_as::<_, Product>(SELECT_PRODUCTS).fetch_all(&self.pool))
                    .await
            }
        }
    }

    async fn update(&self, product: &Product) -> Result<Option<Product>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, Product>(UPDATE_PRODUCT)
                .bind(&product.name)
                .bind(&product.description)
                .bind(product.price)
                .bind(product.stock)
                .bind(&product.category)
                .bind(product.id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = self
            .bounded(sqlx::query(DELETE_PRODUCT).bind(id).execute(&self.pool))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
