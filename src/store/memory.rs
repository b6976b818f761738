//! 进程内存储实现
//!
//! 语义与 Redis / Postgres 实现保持一致，过期时间基于 `tokio::time::Instant`，
//! 测试中可以用 `tokio::time::pause` 和 `advance` 精确控制时钟。
//! 每个存储都可以切换为不可用状态，用来模拟外部服务故障。

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use super::{CacheStore, CounterStore, ProductStore, StoreError, WindowHit};
use crate::models::{NewProduct, Product, ProductFilter};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// 内存键值存储，同时充当计数器和缓存
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 当前未过期的键数量
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .map(|entries| entries.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

fn parse_count(value: &[u8]) -> Result<i64, StoreError> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| StoreError::Unavailable("value is not an integer".into()))
}

/// 未过期计数，缺失或已过期视为 0
fn live_count(entries: &HashMap<String, Entry>, key: &str, now: Instant) -> Result<i64, StoreError> {
    match entries.get(key) {
        Some(entry) if entry.expires_at > now => parse_count(&entry.value),
        _ => Ok(0),
    }
}

fn store_count(entries: &mut HashMap<String, Entry>, key: &str, count: i64, expires_at: Instant) {
    entries.insert(
        key.to_string(),
        Entry {
            value: count.to_string().into_bytes(),
            expires_at,
        },
    );
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get_count(&self, key: &str) -> Result<Option<i64>, StoreError> {
        self.read(key)?.map(|v| parse_count(&v)).transpose()
    }

    async fn increment_and_expire(&self, key: &str, window: Duration) -> Result<i64, StoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();

        let count = live_count(&entries, key, now)? + 1;
        store_count(&mut entries, key, count, now + window);

        Ok(count)
    }

    async fn hit_within_limit(
        &self,
        key: &str,
        limit: i64,
        window: Duration,
    ) -> Result<WindowHit, StoreError> {
        // 比较与加一在同一次加锁内完成
        let mut entries = self.lock()?;
        let now = Instant::now();

        let prior = live_count(&entries, key, now)?;
        if prior >= limit {
            return Ok(WindowHit {
                allowed: false,
                prior,
            });
        }
        store_count(&mut entries, key, prior + 1, now + window);

        Ok(WindowHit {
            allowed: true,
            prior,
        })
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.read(key)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.lock()?.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// 内存商品存储，记录 `get_by_id` 调用次数以便验证缓存命中
#[derive(Default)]
pub struct MemoryProductStore {
    rows: Mutex<BTreeMap<i64, Product>>,
    next_id: Mutex<i64>,
    reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 按 id 读取记录的累计次数
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn rows(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<i64, Product>>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("product store is offline".into()));
        }
        self.rows
            .lock()
            .map_err(|_| StoreError::Unavailable("product store lock poisoned".into()))
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut rows = self.rows()?;
        let id = {
            let mut next_id = self
                .next_id
                .lock()
                .map_err(|_| StoreError::Unavailable("product store lock poisoned".into()))?;
            *next_id += 1;
            *next_id
        };

        let now = Utc::now();
        let created = Product {
            id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            category: product.category,
            created_at: now,
            updated_at: now,
        };
        rows.insert(id, created.clone());

        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Product>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows()?.get(&id).cloned())
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        let rows = self.rows()?;
        Ok(rows
            .values()
            .filter(|p| filter.category().is_none_or(|c| p.category == c))
            .cloned()
            .collect())
    }

    async fn update(&self, product: &Product) -> Result<Option<Product>, StoreError> {
        let mut rows = self.rows()?;
        match rows.get_mut(&product.id) {
            Some(row) => {
                let mut updated = product.clone();
                updated.created_at = row.created_at;
                updated.updated_at = Utc::now();
                *row = updated.clone();
                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.rows()?.remove(&id).is_some())
    }
}
