use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, AsyncConnectionConfig, Client as RedisClient, Script,
    aio::MultiplexedConnection,
};

use super::{CacheStore, CounterStore, StoreError, WindowHit};

// KEYS[1] 计数键，ARGV[1] 上限，ARGV[2] 窗口秒数；返回 {是否放行, 原计数}
static WINDOW_HIT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
local prior = tonumber(redis.call('GET', KEYS[1]) or '0')
if prior >= tonumber(ARGV[1]) then
    return {0, prior}
end
redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[2])
return {1, prior}
",
    )
});

/// Redis 上的计数器与快照缓存，两者共用一个连接，靠键前缀区分
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// 建立多路复用连接，`timeout` 同时作为连接超时和响应超时
    pub async fn connect(client: &RedisClient, timeout: Duration) -> Result<Self, StoreError> {
        let config = AsyncConnectionConfig::new()
            .set_connection_timeout(timeout)
            .set_response_timeout(timeout);
        let conn = client
            .get_multiplexed_async_connection_with_config(&config)
            .await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get_count(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.conn.clone();
        let count: Option<i64> = conn.get(key).await?;
        Ok(count)
    }

    async fn increment_and_expire(&self, key: &str, window: Duration) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();

        // MULTI/EXEC 保证 INCR 与 EXPIRE 不会被其他请求打断
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window.as_secs() as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }

    async fn hit_within_limit(
        &self,
        key: &str,
        limit: i64,
        window: Duration,
    ) -> Result<WindowHit, StoreError> {
        let mut conn = self.conn.clone();

        // 读取、比较、加一在同一个脚本里执行，Redis 单线程保证不会与其他请求交错
        let (allowed, prior): (i64, i64) = WINDOW_HIT
            .key(key)
            .arg(limit)
            .arg(window.as_secs())
            .invoke_async(&mut conn)
            .await?;

        Ok(WindowHit {
            allowed: allowed == 1,
            prior,
        })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
