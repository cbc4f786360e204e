//! # API レスポンスエンベロープ
//!
//! 内部 API の統一レスポンス形式 `{ "data": T }` を提供する。

use serde::{Deserialize, Serialize};

/// 内部 API の統一レスポンス型
///
/// Dispatch Service のすべてのエンドポイントは `{ "data": T }` 形式でレスポンスを返す。
/// 配送失敗もエラーではなく `data.status = "FAILED"` として表現されるため、
/// 呼び出し側は常にこのエンベロープの中身を確認する。
///
/// ## 使用例
///
/// ```
/// use courier_shared::ApiResponse;
///
/// let response = ApiResponse::new("hello");
/// assert_eq!(response.data, "hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// 新しい `ApiResponse` を作成する
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
