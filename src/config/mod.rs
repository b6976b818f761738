use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {key}: {source}")]
    Missing {
        key: &'static str,
        source: env::VarError,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub product_cache_ttl_secs: u64,
    pub store_timeout_ms: u64,
    pub database_max_connections: u32,
}

/// 读取可选环境变量，缺失或解析失败时使用默认值
fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|source| ConfigError::Missing { key, source })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let config = Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            server_host: var_or("SERVER_HOST", "0.0.0.0".to_string()),
            server_port: var_or("SERVER_PORT", 8082),
            api_base_uri: var_or("API_BASE_URI", "/api".to_string()),
            rate_limit_window_secs: var_or("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: var_or("RATE_LIMIT_REQUESTS", 100),
            product_cache_ttl_secs: var_or("PRODUCT_CACHE_TTL", 3600),
            store_timeout_ms: var_or("STORE_TIMEOUT_MS", 2000),
            database_max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10),
        };
        config.validate()?;
        Ok(config)
    }

    /// 窗口、缓存 TTL 与存储超时都必须大于 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_window_secs == 0 {
            return Err(ConfigError::Zero("RATE_LIMIT_WINDOW"));
        }
        if self.product_cache_ttl_secs == 0 {
            return Err(ConfigError::Zero("PRODUCT_CACHE_TTL"));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Zero("STORE_TIMEOUT_MS"));
        }
        Ok(())
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn product_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.product_cache_ttl_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
