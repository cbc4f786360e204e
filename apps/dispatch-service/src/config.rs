//! # Dispatch Service 設定
//!
//! 環境変数から Dispatch Service サーバーの設定を読み込む。

use std::{env, time::Duration};

use courier_domain::dispatch::{DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS};
use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 値を解釈できない
    #[error("{key} の値が不正です: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    /// 最大試行回数が 0
    #[error("DISPATCH_MAX_ATTEMPTS は 1 以上である必要があります")]
    ZeroMaxAttempts,
}

/// Dispatch Service サーバーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// データベース接続 URL（未設定ならインメモリストアを使う）
    pub database_url: Option<String>,
    /// 1 回の送信要求あたりの最大試行回数
    pub max_attempts: u32,
    /// 失敗から次の試行までの待ち時間
    pub backoff:      Duration,
    /// 送信手段の設定
    pub notification: NotificationConfig,
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NotificationBackend {
    /// Mailpit（開発）/ SMTP リレー経由で送信
    Smtp,
    /// Amazon SES v2 経由で送信（本番）
    Ses,
    /// 送信しない（ログ出力のみ）
    Noop,
}

/// 送信手段の設定
///
/// `NOTIFICATION_BACKEND` 環境変数で送信バックエンドを切り替える。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub backend:      NotificationBackend,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:    String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:    u16,
    /// 送信元メールアドレス
    pub from_address: String,
}

impl DispatchConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列の値は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let max_attempts = parse_or(
            get("DISPATCH_MAX_ATTEMPTS"),
            "DISPATCH_MAX_ATTEMPTS",
            DEFAULT_MAX_ATTEMPTS,
        )?;
        if max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        let backoff_seconds = parse_or(
            get("DISPATCH_BACKOFF_SECONDS"),
            "DISPATCH_BACKOFF_SECONDS",
            DEFAULT_BACKOFF.as_secs(),
        )?;

        Ok(Self {
            host: get("DISPATCH_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("DISPATCH_PORT"), "DISPATCH_PORT", 3002)?,
            database_url: get("DATABASE_URL"),
            max_attempts,
            backoff: Duration::from_secs(backoff_seconds),
            notification: NotificationConfig {
                backend:      parse_or(
                    get("NOTIFICATION_BACKEND"),
                    "NOTIFICATION_BACKEND",
                    NotificationBackend::Noop,
                )?,
                smtp_host:    get("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
                smtp_port:    parse_or(get("SMTP_PORT"), "SMTP_PORT", 1025)?,
                from_address: get("NOTIFICATION_FROM_ADDRESS")
                    .unwrap_or_else(|| "noreply@courier.example.com".to_string()),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<DispatchConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DispatchConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_未設定ならデフォルト値を使う() {
        let config = load(&[]).unwrap();

        assert_eq!(
            config,
            DispatchConfig {
                host:         "0.0.0.0".to_string(),
                port:         3002,
                database_url: None,
                max_attempts: 2,
                backoff:      Duration::from_secs(5),
                notification: NotificationConfig {
                    backend:      NotificationBackend::Noop,
                    smtp_host:    "localhost".to_string(),
                    smtp_port:    1025,
                    from_address: "noreply@courier.example.com".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_環境変数の値で上書きできる() {
        let config = load(&[
            ("DISPATCH_PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/courier"),
            ("DISPATCH_MAX_ATTEMPTS", "3"),
            ("DISPATCH_BACKOFF_SECONDS", "1"),
            ("NOTIFICATION_BACKEND", "SMTP"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/courier")
        );
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff, Duration::from_secs(1));
        assert_eq!(config.notification.backend, NotificationBackend::Smtp);
    }

    #[test]
    fn test_空文字列は未設定として扱う() {
        let config = load(&[("DATABASE_URL", ""), ("DISPATCH_PORT", " ")]).unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.port, 3002);
    }

    #[test]
    fn test_最大試行回数0はエラー() {
        assert_eq!(
            load(&[("DISPATCH_MAX_ATTEMPTS", "0")]),
            Err(ConfigError::ZeroMaxAttempts)
        );
    }

    #[rstest]
    #[case("DISPATCH_PORT", "abc")]
    #[case("DISPATCH_MAX_ATTEMPTS", "-1")]
    #[case("DISPATCH_BACKOFF_SECONDS", "5s")]
    #[case("NOTIFICATION_BACKEND", "sendgrid")]
    fn test_解釈できない値はエラー(#[case] key: &'static str, #[case] value: &str) {
        assert_eq!(
            load(&[(key, value)]),
            Err(ConfigError::InvalidValue {
                key,
                value: value.to_string(),
            })
        );
    }
}
