use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::utils::{TokenVerifier, strip_bearer};

use super::guard::{Guard, RequestContext};

/// 校验 Bearer 令牌，通过后把声明放入请求上下文
pub struct AuthGuard {
    verifier: Arc<TokenVerifier>,
}

impl AuthGuard {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl Guard for AuthGuard {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn check(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        let header = ctx
            .authorization
            .as_deref()
            .ok_or(AppError::Unauthorized("Authorization header required"))?;

        let claims = self.verifier.verify(strip_bearer(header))?;
        tracing::debug!("Authenticated {} with role {:?}", claims.sub, claims.role);

        ctx.claims = Some(claims);
        Ok(())
    }
}
