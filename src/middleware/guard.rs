//! 请求守卫链
//!
//! 每个路由组持有一条有序的守卫链（限流 → 鉴权），逐个执行，
//! 任一守卫返回错误即终止请求，后续守卫和处理器都不会运行。
//! 守卫写入 `RequestContext::response_headers` 的响应头无论成功失败都会带回调用方。

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{Extensions, HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::{Claims, client_key};

/// 单个请求在守卫链中共享的上下文
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub client_key: String,
    /// Authorization 头原值，空值视为缺失
    pub authorization: Option<String>,
    pub claims: Option<Claims>,
    pub response_headers: HeaderMap,
}

impl RequestContext {
    pub fn from_parts(headers: &HeaderMap, extensions: &Extensions) -> Self {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            request_id: Uuid::new_v4(),
            client_key: client_key(headers, extensions),
            authorization,
            claims: None,
            response_headers: HeaderMap::new(),
        }
    }
}

#[async_trait]
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, ctx: &mut RequestContext) -> Result<(), AppError>;
}

#[derive(Clone, Default)]
pub struct GuardChain {
    guards: Vec<Arc<dyn Guard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个守卫，执行顺序即追加顺序
    pub fn then<G: Guard + 'static>(mut self, guard: G) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }

    pub async fn run(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        for guard in &self.guards {
            if let Err(e) = guard.check(ctx).await {
                tracing::debug!("Guard {} rejected request: {}", guard.name(), e);
                return Err(e);
            }
        }
        Ok(())
    }
}

pub async fn guard_requests(
    State(chain): State<GuardChain>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut ctx = RequestContext::from_parts(req.headers(), req.extensions());
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id,
        client = %ctx.client_key,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut response = match chain.run(&mut ctx).instrument(span.clone()).await {
        Ok(()) => {
            if let Some(claims) = ctx.claims.take() {
                req.extensions_mut().insert(claims);
            }
            next.run(req).instrument(span).await
        }
        Err(e) => e.into_response(),
    };

    response.headers_mut().extend(ctx.response_headers);
    response
}
