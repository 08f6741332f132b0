//! 商城认证服务主入口

use shop_auth::{
    auth::JwtService,
    config::AppConfig,
    db,
    events::{spawn_event_logger, EventBus},
    handlers::health,
    middleware::AppState,
    repository::{SessionStore, Stores},
    routes,
    services::AuthService,
    telemetry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;

/// 过期刷新令牌清理间隔
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("shop-auth {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 按优先级加载：.env.local > .env.development > .env
    if let Ok(env) = std::env::var("SHOP_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志与指标
    telemetry::init_telemetry(&config.logging)?;
    telemetry::init_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Shop auth service starting...");

    // 3. 数据库连接池 + 迁移
    let db_pool = db::connect(&config.database).await?;
    db::migrate(&db_pool).await?;

    tracing::info!("Database initialized");

    // 4. 事件总线，日志订阅者保证至少一个接收方
    let event_bus = EventBus::new(config.events.channel_capacity);
    let _event_logger = spawn_event_logger(&event_bus);

    // 5. 构建服务与应用状态
    let stores = Stores::postgres(db_pool.clone());
    spawn_purge_task(stores.sessions.clone());

    let jwt_service = Arc::new(JwtService::from_config(&config.security)?);
    let auth_service = Arc::new(AuthService::new(
        stores,
        Arc::new(event_bus),
        jwt_service.clone(),
        &config.security,
    ));

    let app_state = Arc::new(AppState {
        config: config.clone(),
        db: Some(db_pool),
        auth_service,
        jwt_service,
    });

    let app = routes::create_router(app_state);

    // 6. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 7. 优雅关闭，超时后强制退出
    let shutdown_timeout = Duration::from_secs(config.server.graceful_shutdown_timeout_secs);
    let drain_started = Arc::new(Notify::new());
    let notify = drain_started.clone();

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        notify.notify_one();
    });

    tokio::select! {
        result = async move { server.await } => result?,
        _ = async {
            drain_started.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 周期性删除过期的刷新令牌
fn spawn_purge_task(sessions: Arc<dyn SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Expired refresh tokens purged"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired refresh tokens"),
            }
        }
    });
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }
}

/// 打印帮助信息
fn print_help() {
    println!("shop-auth {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: shop-auth [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 SHOP_ 前缀的环境变量完成，例如 SHOP_DATABASE__URL");
}
