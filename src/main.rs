use clap::Parser;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload_finalizer::config::FinalizerConfig;
use upload_finalizer::infrastructure::{notify, staging};
use upload_finalizer::services::finalizer::FinalizerService;
use upload_finalizer::services::recovery::RecoveryScanner;
use upload_finalizer::{AppState, create_app};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run mode: "serve" (hook endpoint + startup sweep) or "sweep" (one sweep, then exit)
    #[arg(short, long, default_value = "serve")]
    mode: String,

    /// Port for the hook/health server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initial Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upload_finalizer=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Upload Finalizer [Mode: {}]...", args.mode);

    // 2. Configuration & Directory Setup
    let config = FinalizerConfig::from_env();
    info!(
        "⚙️  Staging: {} -> Final store: {}",
        config.staging_dir.display(),
        config.storage_root.display()
    );
    staging::setup_directories(&config).await?;

    let notifier = notify::setup_notifier(&config);
    let finalizer = Arc::new(FinalizerService::new(config.clone(), notifier));

    // 3. One-shot reconciliation mode for manual recovery passes
    if args.mode == "sweep" {
        let scanner = RecoveryScanner::new(
            FinalizerConfig {
                scan_startup_delay_secs: 0,
                ..config
            },
            finalizer.clone(),
        );
        scanner.run().await;
        // Dispatched tasks finish on their own; give them a moment before exiting
        while !finalizer.registry().is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        info!("👋 Sweep complete.");
        return Ok(());
    }

    // 4. Startup Recovery Sweep (delayed, in the background)
    let scanner = RecoveryScanner::new(config.clone(), finalizer.clone());
    tokio::spawn(scanner.run());

    // 5. Hook & Health Server
    let state = AppState {
        finalizer,
        config: config.clone(),
    };

    let trace_layer = TraceLayer::new_for_http()
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ Hook server listening on: http://0.0.0.0:{}", args.port);
    info!(
        "📖 Swagger UI documentation: http://localhost:{}/swagger-ui",
        args.port
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
        })
        .await
    {
        error!("❌ Server runtime error: {}", e);
    }

    info!("👋 Finalizer exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
