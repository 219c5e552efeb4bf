use anyhow::{Context, Result};
use dhan_livefeed::bin_common::{load_config_from_env, parse_args, BinaryRunner, ConfigType, RunConfig};
use dhan_livefeed::http;
use dhan_livefeed::livefeed::{
    init_tracing, FeedRegistry, LiveFeedConfig, ShutdownManager, StaticDirectory,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct LiveFeedServer {
    run_config: RunConfig,
    config: LiveFeedConfig,
    directory: Arc<StaticDirectory>,
    registry: FeedRegistry,
    shutdown: ShutdownManager,
}

impl LiveFeedServer {
    /// Open a feed for every account in the directory
    async fn subscribe_known_accounts(&self) {
        for user_id in self.directory.user_ids() {
            match self.registry.init_user_subscription(&user_id).await {
                Ok(summary) => info!(
                    "Subscribed user {} to {} instruments",
                    user_id, summary.subscribed_count
                ),
                Err(e) => warn!("Skipping user {}: {}", user_id, e),
            }
        }
    }

    /// Periodic one-line status while the process runs
    fn spawn_status_logger(&self) -> Option<JoinHandle<()>> {
        let interval = self.run_config.status_interval_secs;
        if interval == 0 {
            return None;
        }

        let registry = self.registry.clone();
        let shutdown = self.shutdown.clone();
        Some(tokio::spawn(async move {
            loop {
                shutdown.interruptible_sleep(Duration::from_secs(interval)).await;
                if !shutdown.is_running() {
                    break;
                }
                let statuses = registry.list_connections();
                let open = statuses.iter().filter(|s| s.open).count();
                let prices: usize = statuses.iter().map(|s| s.cached_prices).sum();
                info!(
                    "[Status] {} feeds ({} open), {} cached prices",
                    statuses.len(),
                    open,
                    prices
                );
            }
        }))
    }
}

impl BinaryRunner for LiveFeedServer {
    async fn run(&mut self) -> Result<()> {
        self.shutdown.spawn_signal_handler();
        self.subscribe_known_accounts().await;
        let status_logger = self.spawn_status_logger();

        let bind_addr = &self.config.server.bind_addr;
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", bind_addr))?;
        info!("HTTP server listening on {}", bind_addr);

        let served = http::serve(listener, self.registry.clone(), self.shutdown.clone()).await;

        self.registry.shutdown();
        if let Some(handle) = status_logger {
            handle.abort();
        }
        served
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        Some(format!("Accounts configured: {}", self.directory.len()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config_type = match parse_args().into_iter().next() {
        Some(path) => ConfigType::Custom(path),
        None => ConfigType::Feed,
    };
    let config_path = load_config_from_env(config_type);
    let config = LiveFeedConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_tracing(&config.log_level);
    config.log();

    let accounts_path = match std::env::var(ConfigType::Accounts.env_var_name()) {
        Ok(path) => PathBuf::from(path),
        Err(_) => config
            .accounts_path
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| load_config_from_env(ConfigType::Accounts)),
    };
    let directory = Arc::new(
        StaticDirectory::load(&accounts_path)
            .with_context(|| format!("Failed to load {}", accounts_path.display()))?,
    );

    let registry = FeedRegistry::from_config(&config, directory.clone(), directory.clone());

    let mut server = LiveFeedServer {
        run_config: RunConfig::new("Dhan Live Feed"),
        config,
        directory,
        registry,
        shutdown: ShutdownManager::new(),
    };

    server.execute().await
}
