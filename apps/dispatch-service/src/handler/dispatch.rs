//! # 配信ハンドラ
//!
//! Dispatch Service の配信 API を提供する。
//!
//! ## エンドポイント
//!
//! - `POST /internal/dispatches` - メールを送信（配信失敗も 200 + `status=FAILED`）
//! - `GET /internal/dispatches?status=` - 配信履歴（作成日時の降順）
//! - `GET /internal/dispatches/{id}` - 配信記録の取得
//! - `POST /internal/dispatches/{id}/retry` - 再送（送信済みなら何もしない）

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path,
        Query,
        State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use courier_domain::dispatch::{DispatchAttempt, DispatchAttemptId, DispatchStatus};
use courier_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::DispatchError,
    usecase::{DispatchUseCaseImpl, SendMailInput},
};

/// 配信 API の共有状態
pub struct DispatchState {
    pub usecase: DispatchUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 送信リクエスト
///
/// 欠けたフィールドは空文字列として扱い、ユースケースの検証で 400 にする。
#[derive(Debug, Deserialize)]
pub struct SendDispatchRequest {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub subject:   String,
    #[serde(default)]
    pub body:      String,
}

/// 配信履歴のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListDispatchesQuery {
    pub status: Option<String>,
}

/// 配信記録 DTO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchAttemptDto {
    pub id:            Uuid,
    pub recipient:     String,
    pub subject:       String,
    pub body:          String,
    pub status:        DispatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error:         Option<String>,
    pub attempt_count: u32,
    pub created_at:    DateTime<Utc>,
    pub updated_at:    DateTime<Utc>,
    pub finalized_at:  Option<DateTime<Utc>>,
}

impl From<&DispatchAttempt> for DispatchAttemptDto {
    fn from(attempt: &DispatchAttempt) -> Self {
        Self {
            id:            *attempt.id().as_uuid(),
            recipient:     attempt.recipient().to_string(),
            subject:       attempt.subject().to_string(),
            body:          attempt.body().to_string(),
            status:        attempt.status(),
            error:         attempt.error().map(str::to_string),
            attempt_count: attempt.attempt_count(),
            created_at:    attempt.created_at(),
            updated_at:    attempt.updated_at(),
            finalized_at:  attempt.finalized_at(),
        }
    }
}

fn attempt_id(
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<DispatchAttemptId, DispatchError> {
    let Path(id) = path.map_err(|e| DispatchError::BadRequest(e.body_text()))?;
    Ok(DispatchAttemptId::from_uuid(id))
}

// --- ハンドラ ---

/// POST /internal/dispatches
///
/// 送信の成否にかかわらず、最終的な配信記録を 200 で返す。
#[tracing::instrument(skip_all)]
pub async fn send_dispatch(
    State(state): State<Arc<DispatchState>>,
    payload: Result<Json<SendDispatchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, DispatchError> {
    let Json(req) = payload.map_err(|e| DispatchError::BadRequest(e.body_text()))?;

    let attempt = state
        .usecase
        .send(SendMailInput {
            recipient: req.recipient,
            subject:   req.subject,
            body:      req.body,
        })
        .await?;

    let response = ApiResponse::new(DispatchAttemptDto::from(&attempt));
    Ok((StatusCode::OK, Json(response)))
}

/// GET /internal/dispatches
pub async fn list_dispatches(
    State(state): State<Arc<DispatchState>>,
    Query(query): Query<ListDispatchesQuery>,
) -> Result<impl IntoResponse, DispatchError> {
    let attempts = state.usecase.list(query.status.as_deref()).await?;

    let items: Vec<DispatchAttemptDto> = attempts.iter().map(DispatchAttemptDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// GET /internal/dispatches/{id}
pub async fn get_dispatch(
    State(state): State<Arc<DispatchState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, DispatchError> {
    let id = attempt_id(path)?;
    let attempt = state.usecase.get(&id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(DispatchAttemptDto::from(&attempt))),
    ))
}

/// POST /internal/dispatches/{id}/retry
///
/// 送信済みの記録はそのまま、それ以外は新しく作成した記録を返す。
#[tracing::instrument(skip_all)]
pub async fn resend_dispatch(
    State(state): State<Arc<DispatchState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, DispatchError> {
    let id = attempt_id(path)?;
    let attempt = state.usecase.resend(&id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(DispatchAttemptDto::from(&attempt))),
    ))
}
