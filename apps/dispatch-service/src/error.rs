//! # Dispatch Service エラー定義
//!
//! Dispatch Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! 送信手段の失敗はここに現れない。配信記録の `status` / `error` として
//! 吸収されるため、呼び出しそのものが失敗するのは記録が見つからない場合と
//! ストアが利用できない場合に限られる。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_domain::DomainError;
use courier_infra::InfraError;
use courier_shared::{ErrorResponse, event_log::error as log_error};
use thiserror::Error;

/// Dispatch Service で発生するエラー
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 配信記録が見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 配信記録ストアが利用できない
    #[error("ストアが利用できません: {0}")]
    StoreUnavailable(#[from] InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for DispatchError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{entity_type} が見つかりません: {id}"))
            }
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let body = match &self {
            DispatchError::NotFound(msg) => ErrorResponse::not_found(msg.clone()),
            DispatchError::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
            DispatchError::StoreUnavailable(e) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::DATABASE,
                    span_trace = %e.span_trace(),
                    "配信記録ストアエラー: {}",
                    e
                );
                ErrorResponse::service_unavailable("配信記録ストアを利用できません")
            }
            DispatchError::Internal(msg) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::INTERNAL,
                    "内部エラー: {}",
                    msg
                );
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
