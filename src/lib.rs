use std::sync::Arc;

use cache::ProductAccessor;
use config::Config;
use middleware::RateLimiter;
use store::{CacheStore, CounterStore, ProductStore};
use utils::TokenVerifier;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod store;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub products: ProductAccessor,
    pub rate_limiter: Arc<RateLimiter>,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// 计数器与缓存通常是同一个 Redis，这里分开注入以便替换
    pub fn new(
        config: Config,
        records: Arc<dyn ProductStore>,
        cache: Arc<dyn CacheStore>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        let products = ProductAccessor::new(records, cache, config.product_cache_ttl());
        let rate_limiter = Arc::new(RateLimiter::from_config(counters, &config));
        let verifier = Arc::new(TokenVerifier::new(&config.jwt_secret));

        Self {
            config,
            products,
            rate_limiter,
            verifier,
        }
    }
}
