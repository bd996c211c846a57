use tokio::{net::TcpListener, signal};
use tracing::info;

use user_management::infrastructure::{
    config::{load_config, log_config_source},
    logger::Logger,
    open_store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, source) = load_config()?;
    let _log_guard = Logger::init(&config.logging)?;
    log_config_source(&config, source.as_deref());

    let store = open_store(&config.database).await?;
    let app = user_management::router(store.clone(), &config.http);

    let listener =
        TcpListener::bind((config.http.bind_address.as_str(), config.http.port)).await?;
    info!(
        "Server is listening at {} (routes under {})",
        listener.local_addr()?,
        config.http.collection_path()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("服务已停止");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("收到关闭信号，正在停止服务...");
}
