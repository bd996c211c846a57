//! 应用层：路由装配

pub mod users;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::core::middleware::request_logging_middleware;
use crate::infrastructure::config::HttpConfig;
use users::{
    handler::{self, AppState},
    service::UserService,
    store::UserStore,
};

/// 创建路由，四个操作挂在 `http.base_path` 下
pub fn router(store: Arc<dyn UserStore>, http: &HttpConfig) -> Router {
    let state = AppState {
        user_service: UserService::new(store),
    };

    Router::new()
        .route(
            &http.collection_path(),
            get(handler::list_users).post(handler::create_user),
        )
        .route(
            &http.item_path(),
            put(handler::update_user).delete(handler::delete_user),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(TimeoutLayer::new(Duration::from_secs(http.timeout_seconds))),
        )
        .with_state(state)
}
