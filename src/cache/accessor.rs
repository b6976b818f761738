use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::product_key;
use crate::error::AppError;
use crate::models::{NewProduct, Product, ProductChanges, ProductFilter};
use crate::store::{CacheStore, ProductStore};

const PRODUCT_NOT_FOUND: &str = "Product not found";

/// 商品读写入口，负责维护缓存与数据库的一致性
///
/// - 创建、更新成功后写入快照
/// - 按 id 读取先查缓存，未命中再查数据库并回填
/// - 列表查询始终走数据库
/// - 删除成功后主动删除快照
///
/// 缓存操作失败只记录日志，不影响以数据库为准的结果。
#[derive(Clone)]
pub struct ProductAccessor {
    records: Arc<dyn ProductStore>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ProductAccessor {
    pub fn new(records: Arc<dyn ProductStore>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            records,
            cache,
            ttl,
        }
    }

    pub async fn create(&self, product: NewProduct) -> Result<Product, AppError> {
        let created = self
            .records
            .create(product)
            .await
            .map_err(AppError::store("Failed to create product"))?;

        self.write_snapshot(&created).await;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Product, AppError> {
        if let Some(product) = self.read_snapshot(id).await {
            tracing::debug!("Get product from cache: {}", id);
            return Ok(product);
        }

        let product = self
            .records
            .get_by_id(id)
            .await
            .map_err(AppError::store("Failed to load product"))?
            .ok_or(AppError::NotFound(PRODUCT_NOT_FOUND))?;

        self.write_snapshot(&product).await;
        Ok(product)
    }

    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        self.records
            .list(filter)
            .await
            .map_err(AppError::store("Failed to list products"))
    }

    pub async fn update(&self, id: i64, changes: ProductChanges) -> Result<Product, AppError> {
        let mut product = self
            .records
            .get_by_id(id)
            .await
            .map_err(AppError::store("Failed to load product"))?
            .ok_or(AppError::NotFound(PRODUCT_NOT_FOUND))?;

        changes.apply(&mut product);

        // 读取之后记录可能已被并发删除
        let updated = self
            .records
            .update(&product)
            .await
            .map_err(AppError::store("Failed to update product"))?
            .ok_or(AppError::NotFound(PRODUCT_NOT_FOUND))?;

        self.write_snapshot(&updated).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let deleted = self
            .records
            .delete(id)
            .await
            .map_err(AppError::store("Failed to delete product"))?;
        if !deleted {
            return Err(AppError::NotFound(PRODUCT_NOT_FOUND));
        }

        let key = product_key(id);
        if let Err(e) = self.cache.delete(&key).await {
            tracing::warn!("Failed to invalidate cached product {}: {}", key, e);
        }
        Ok(())
    }

    /// 缓存读取失败或快照无法解析都按未命中处理
    async fn read_snapshot(&self, id: i64) -> Option<Product> {
        let key = product_key(id);
        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Product>(&bytes) {
                Ok(product) => Some(product),
                Err(e) => {
                    tracing::warn!("Discarding undecodable snapshot {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read cached product {}: {}", key, e);
                None
            }
        }
    }

    async fn write_snapshot(&self, product: &Product) {
        let key = product_key(product.id);
        let json = match serde_json::to_vec(product) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize product {}: {}", key, e);
                return;
            }
        };

        match self.cache.set_with_ttl(&key, &json, self.ttl).await {
            Ok(()) => tracing::debug!("Set product to cache: {}", key),
            Err(e) => tracing::warn!("Failed to cache product {}: {}", key, e),
        }
    }
}
