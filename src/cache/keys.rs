/// 商品快照缓存键前缀
const PRODUCT_PREFIX: &str = "product:";

/// 限流计数器键前缀
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// 生成商品快照缓存键
pub fn product_key(id: i64) -> String {
    format!("{}{}", PRODUCT_PREFIX, id)
}

/// 生成限流计数器键
pub fn rate_limit_key(client: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, client)
}
