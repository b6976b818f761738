//! 外部存储接口
//!
//! 计数器、缓存与商品记录都放在进程外的存储中，原子性由存储自身保证
//! （Redis 的 Lua 脚本、SET EX、DEL，Postgres 的单语句写入）。
//! 这里只定义访问契约，方便在测试中替换为内存实现。

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{NewProduct, Product, ProductFilter};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use self::memory::{MemoryProductStore, MemoryStore};
pub use self::postgres::PgProductStore;
pub use self::redis::RedisStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store call timed out")]
    Timeout,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 一次限流检查的结果，`prior` 是本次请求之前的计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    pub allowed: bool,
    pub prior: i64,
}

/// 限流计数器存储
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 读取当前计数，键不存在时返回 None
    async fn get_count(&self, key: &str) -> Result<Option<i64>, StoreError>;

    /// 原子地加一并把过期时间重置为 `window`，返回加一后的值
    async fn increment_and_expire(&self, key: &str, window: Duration) -> Result<i64, StoreError>;

    /// 读取计数、与 `limit` 比较、未达上限时加一并重置过期时间，
    /// 整个过程对同一个键的其他请求是原子的。达到上限时计数和过期时间都不变。
    async fn hit_within_limit(
        &self,
        key: &str,
        limit: i64,
        window: Duration,
    ) -> Result<WindowHit, StoreError>;
}

/// 快照缓存存储
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// 商品记录存储，唯一的数据来源
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>, StoreError>;

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError>;

    /// 写回整条记录并刷新 updated_at，记录已不存在时返回 None
    async fn update(&self, product: &Product) -> Result<Option<Product>, StoreError>;

    /// 删除成功返回 true，记录不存在返回 false
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
