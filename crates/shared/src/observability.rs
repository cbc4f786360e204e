//! # トレーシング初期化
//!
//! `RUST_LOG` と `LOG_FORMAT` からサブスクライバを組み立てる。
//! 環境変数の読み取りは [`TracingConfig::from_lookup`] に切り出してあり、
//! テストではプロセスの環境を書き換えずに検証できる。

/// `RUST_LOG` が未設定、または解釈できないときのフィルタ
///
/// 試行ループ（`courier_dispatch_service::usecase`）とストア・送信手段（`courier_infra`）は
/// 再試行の待機ログを含めて debug まで出し、それ以外は info とする。
pub const DEFAULT_FILTER: &str =
    "info,courier_dispatch_service::usecase=debug,courier_infra=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 イベントの JSON（ログ基盤への転送用）
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// 前後の空白と大文字小文字は無視する。未知の値は `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub service_name:        String,
    pub log_format:          LogFormat,
    /// `EnvFilter` のディレクティブ
    pub filter:              String,
    /// 解釈できなかった `LOG_FORMAT` の値。初期化後に警告として出す
    pub rejected_log_format: Option<String>,
}

impl TracingConfig {
    /// プロセスの環境変数から読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// 任意の参照関数から読み取る
    ///
    /// 空文字列の値は未設定と同じに扱う。
    pub fn from_lookup(
        service_name: impl Into<String>,
        get: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let get = |key: &str| get(key).filter(|value| !value.trim().is_empty());

        let filter = get("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let (log_format, rejected_log_format) = match get("LOG_FORMAT") {
            None => (LogFormat::default(), None),
            Some(raw) => match LogFormat::parse(&raw) {
                Some(format) => (format, None),
                None => (LogFormat::default(), Some(raw)),
            },
        };

        Self {
            service_name: service_name.into(),
            log_format,
            filter,
            rejected_log_format,
        }
    }
}

/// トレーシングを初期化する
///
/// `tracing_error::ErrorLayer` も登録するため、インフラ層エラーの `SpanTrace` には
/// 失敗した配信記録の `dispatch_id` を含むスパンが残る。
#[cfg(feature = "observability")]
pub fn init_tracing(config: &TracingConfig) {
    use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let (env_filter, rejected_filter) = match EnvFilter::try_new(&config.filter) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_FILTER), Some(e.to_string())),
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::info!(
        service = %config.service_name,
        log_format = ?config.log_format,
        "トレーシングを初期化しました"
    );
    if let Some(value) = &config.rejected_log_format {
        tracing::warn!(%value, "LOG_FORMAT を解釈できないため pretty で出力します");
    }
    if let Some(error) = rejected_filter {
        tracing::warn!(
            %error,
            filter = %config.filter,
            "RUST_LOG を解釈できないため既定のフィルタを使います"
        );
    }
}
