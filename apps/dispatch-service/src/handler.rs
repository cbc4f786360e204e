//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケースに委譲

pub mod dispatch;
pub mod health;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
pub use dispatch::{
    DispatchAttemptDto,
    DispatchState,
    get_dispatch,
    list_dispatches,
    resend_dispatch,
    send_dispatch,
};
pub use health::health_check;

/// Dispatch Service のルーターを構築する
pub fn router(state: Arc<DispatchState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/internal/dispatches",
            get(list_dispatches).post(send_dispatch),
        )
        .route("/internal/dispatches/{id}", get(get_dispatch))
        .route("/internal/dispatches/{id}/retry", post(resend_dispatch))
        .with_state(state)
}
