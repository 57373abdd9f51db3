use std::sync::Arc;
use std::time::Duration;

use accessd::admin::{self, AdminState};
use accessd::cache::DebounceCache;
use accessd::cli::{Cli, Commands};
use accessd::config::Config;
use accessd::engine::Engine;
use accessd::events::EventBus;
use accessd::ingress;
use accessd::logging;
use accessd::persistence::PersistenceAdapter;
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(opts) => {
            info!("Starting accessd");
            let mut config = Config::load(opts.config.as_deref())?;
            if let Some(port) = opts.port {
                config.server.port = port;
            }
            if let Some(admin_port) = opts.admin_port {
                config.admin.port = admin_port;
            }

            let pool = accessd::db::open_pool(&config.resolved_db_path())?;
            let persistence = Arc::new(PersistenceAdapter::new(pool));
            let debounce = Arc::new(DebounceCache::new(Duration::from_secs(
                config.debounce.window_secs,
            )));
            let events = EventBus::new();
            let hardware_timeout = Duration::from_millis(config.hardware.timeout_ms);

            let engine = Arc::new(Engine::new(
                persistence.clone(),
                debounce,
                events,
                hardware_timeout,
            ));

            let ingress_addr = format!("{}:{}", config.server.host, config.server.port).parse()?;
            let admin_addr = format!("{}:{}", config.admin.host, config.admin.port).parse()?;

            let admin_state = AdminState {
                persistence,
                engine: engine.clone(),
                token: config.admin.token.clone(),
                start_time: std::time::Instant::now(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            };

            let (shutdown_tx, _) = broadcast::channel(1);

            let ingress_task = tokio::spawn(ingress::run(
                ingress_addr,
                engine,
                shutdown_tx.subscribe(),
            ));
            let admin_task = tokio::spawn(admin::serve(
                admin_addr,
                admin_state,
                shutdown_tx.subscribe(),
            ));

            info!(%ingress_addr, %admin_addr, "accessd is up");

            wait_for_shutdown_signal().await;
            let _ = shutdown_tx.send(());

            let _ = ingress_task.await?;
            admin_task.await??;

            info!("accessd shut down gracefully");
        }
        Commands::Config(opts) => {
            let config = Config::load(opts.config.as_deref())?;
            match opts.action {
                accessd::cli::ConfigAction::Show => {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                accessd::cli::ConfigAction::Validate => {
                    accessd::config::validate_config_object(&config)?;
                    info!("Configuration is valid");
                }
                accessd::cli::ConfigAction::Init => {
                    Config::write_default(opts.config.as_deref().unwrap_or("accessd.json"))?;
                    info!("Configuration file created");
                }
            }
        }
        Commands::Version => {
            println!("accessd {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("received SIGTERM, initiating shutdown");
        }
    }
}
