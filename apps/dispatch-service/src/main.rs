//! # Dispatch Service サーバー
//!
//! メール配信を実行し、すべての試行を配信記録として残す内部サービス。
//!
//! ## 役割
//!
//! - **配信**: 送信手段を呼び出し、失敗時は固定バックオフで再試行する
//! - **記録**: 各試行の状態遷移を配信記録ストアに永続化する
//! - **再送**: 送信済みでない記録を、新しい記録として再送する
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `DISPATCH_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `DISPATCH_PORT` | No | ポート番号（デフォルト: `3002`） |
//! | `DATABASE_URL` | No | PostgreSQL 接続 URL（未設定ならインメモリストア） |
//! | `DISPATCH_MAX_ATTEMPTS` | No | 最大試行回数（デフォルト: `2`） |
//! | `DISPATCH_BACKOFF_SECONDS` | No | 再試行までの待ち秒数（デフォルト: `5`） |
//! | `NOTIFICATION_BACKEND` | No | `smtp` / `ses` / `noop`（デフォルト: `noop`） |
//! | `LOG_FORMAT` | No | `json` / `pretty`（デフォルト: `pretty`） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（インメモリストア + Mailpit）
//! NOTIFICATION_BACKEND=smtp cargo run -p courier-dispatch-service
//!
//! # 本番環境
//! DATABASE_URL=postgres://... NOTIFICATION_BACKEND=ses cargo run -p courier-dispatch-service --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use courier_dispatch_service::{
    config::{DispatchConfig, NotificationBackend, NotificationConfig},
    handler::{self, DispatchState},
    usecase::DispatchUseCaseImpl,
};
use courier_domain::{clock::SystemClock, dispatch::FixedBackoff};
use courier_infra::{
    db,
    repository::{
        DispatchAttemptRepository,
        InMemoryDispatchAttemptRepository,
        PostgresDispatchAttemptRepository,
    },
    transport::{
        MailTransport,
        NoopMailTransport,
        SesMailTransport,
        SmtpMailTransport,
        create_ses_client,
    },
};
use courier_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Dispatch Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("dispatch-service"));

    let config = DispatchConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Dispatch Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let repository = create_repository(config.database_url.as_deref()).await?;
    let transport = create_transport(&config.notification).await;

    let usecase = DispatchUseCaseImpl::new(
        repository,
        transport,
        Arc::new(FixedBackoff::new(config.backoff)),
        Arc::new(SystemClock),
        config.max_attempts,
    );
    let state = Arc::new(DispatchState { usecase });

    let app = handler::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Dispatch Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// `DATABASE_URL` があれば PostgreSQL、なければインメモリのストアを作る
async fn create_repository(
    database_url: Option<&str>,
) -> anyhow::Result<Arc<dyn DispatchAttemptRepository>> {
    let Some(database_url) = database_url else {
        tracing::warn!("DATABASE_URL が未設定のため、インメモリストアを使用します");
        return Ok(Arc::new(InMemoryDispatchAttemptRepository::new()));
    };

    let pool = db::connect(database_url)
        .await
        .context("配信記録ストアの初期化に失敗しました")?;

    Ok(Arc::new(PostgresDispatchAttemptRepository::new(pool)))
}

async fn create_transport(config: &NotificationConfig) -> Arc<dyn MailTransport> {
    tracing::info!(backend = %config.backend, "送信バックエンドを初期化します");
    match config.backend {
        NotificationBackend::Smtp => Arc::new(SmtpMailTransport::new(
            &config.smtp_host,
            config.smtp_port,
            config.from_address.clone(),
        )),
        NotificationBackend::Ses => Arc::new(SesMailTransport::new(
            create_ses_client().await,
            config.from_address.clone(),
        )),
        NotificationBackend::Noop => Arc::new(NoopMailTransport),
    }
}
