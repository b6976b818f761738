use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    AppState,
    middleware::{
        AuthGuard, GuardChain, LIMIT_HEADER, REMAINING_HEADER, RateLimitGuard, guard_requests,
        log_errors,
    },
    routes::{health, product},
};

/// 公开路由只经过限流
pub fn public_guards(state: &AppState) -> GuardChain {
    GuardChain::new().then(RateLimitGuard::new(state.rate_limiter.clone()))
}

/// 写操作路由先限流再鉴权
pub fn protected_guards(state: &AppState) -> GuardChain {
    public_guards(state).then(AuthGuard::new(state.verifier.clone()))
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([
            HeaderName::from_static(LIMIT_HEADER),
            HeaderName::from_static(REMAINING_HEADER),
        ])
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/products", get(product::list_products))
        .route("/products/{id}", get(product::get_product))
        .route_layer(from_fn_with_state(public_guards(&state), guard_requests));

    let protected_routes = Router::new()
        .route("/products", post(product::create_product))
        .route(
            "/products/{id}",
            put(product::update_product).delete(product::delete_product),
        )
        .route_layer(from_fn_with_state(protected_guards(&state), guard_requests));

    let api = Router::new().merge(public_routes).merge(protected_routes);

    let router = Router::new()
        .route("/health", get(health::health_check))
        .route_layer(from_fn_with_state(public_guards(&state), guard_requests));

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        router.merge(api)
    } else {
        router.nest(base, api)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(cors())
                .layer(from_fn(log_errors)),
        )
        .with_state(state)
}
