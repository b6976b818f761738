use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};

use crate::{
    cache::keys::rate_limit_key, config::Config, error::AppError, store::CounterStore,
};

use super::guard::{Guard, RequestContext};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
}

impl Decision {
    fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(self.remaining));
    }
}

/// 固定窗口限流器
///
/// 每个客户端一个计数器。计数达到上限后直接拒绝，既不加一也不刷新过期时间；
/// 未达上限时加一并把过期时间重置为一个完整窗口，所以持续有请求时窗口会向后顺延。
/// 比较和加一由计数器存储原子完成，并发请求不会越过上限。
/// 计数器存储出错时一律拒绝请求。
pub struct RateLimiter {
    counters: Arc<dyn CounterStore>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(counters: Arc<dyn CounterStore>, limit: u32, window: Duration) -> Self {
        Self {
            counters,
            limit,
            window,
        }
    }

    pub fn from_config(counters: Arc<dyn CounterStore>, config: &Config) -> Self {
        Self::new(counters, config.rate_limit_requests, config.rate_limit_window())
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub async fn admit(&self, client: &str) -> Result<Decision, AppError> {
        let key = rate_limit_key(client);
        let limit = i64::from(self.limit);

        let hit = self
            .counters
            .hit_within_limit(&key, limit, self.window)
            .await
            .map_err(AppError::store("Rate limit check failed"))?;

        if !hit.allowed {
            tracing::info!("Rate limit exceeded for {}", client);
            return Ok(Decision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
            });
        }

        Ok(Decision {
            allowed: true,
            limit: self.limit,
            remaining: (limit - hit.prior - 1).max(0) as u32,
        })
    }
}

/// 守卫链中的限流环节
pub struct RateLimitGuard {
    limiter: Arc<RateLimiter>,
}

impl RateLimitGuard {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Guard for RateLimitGuard {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn check(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        let decision = self.limiter.admit(&ctx.client_key).await?;
        decision.write_headers(&mut ctx.response_headers);

        if decision.allowed {
            Ok(())
        } else {
            Err(AppError::RateLimited)
        }
    }
}
