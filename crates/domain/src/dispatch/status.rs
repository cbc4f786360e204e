//! # 配信ステータス

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// 配信ステータス
///
/// 外部表現（API レスポンス、DB カラム）は大文字の `PENDING` / `RETRYING` /
/// `SUCCESS` / `FAILED`。パースは大文字小文字を区別しない。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum DispatchStatus {
    /// 作成直後（まだ送信していない）
    Pending,
    /// 送信試行中
    Retrying,
    /// 送信成功（終端）
    Success,
    /// 送信失敗（最終試行後は終端）
    Failed,
}

impl DispatchStatus {
    /// ステータス名を返す（DB 格納値と同じ）
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// 一覧取得時のステータスフィルタ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// 全件
    All,
    /// 指定ステータスのみ
    Only(DispatchStatus),
    /// どのステータスにも一致しない文字列が指定された
    Unmatched,
}

impl StatusFilter {
    /// クエリ文字列を解釈する
    ///
    /// 未指定・空文字列・空白のみは全件、既知のステータス名は大文字小文字を
    /// 区別せずに一致させる。未知の名前はエラーにせず、空の結果を返すフィルタになる。
    pub fn parse(filter: Option<&str>) -> Self {
        let Some(trimmed) = filter.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::All;
        };
        trimmed
            .parse::<DispatchStatus>()
            .map_or(Self::Unmatched, Self::Only)
    }
}
