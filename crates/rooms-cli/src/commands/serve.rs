//! Web server command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use rooms_core::{RedisMessageService, RedisRoomService};
use rooms_hub::{config, Hub, HubConfig};
use rooms_web::AppState;
use tracing::{info, warn};

#[derive(Args)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "ROOMS_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Messages a connection may have queued before it is dropped as too slow
    #[arg(long, env = "ROOMS_QUEUE_CAPACITY", default_value_t = config::DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Pending hub requests before submitters wait
    #[arg(long, env = "ROOMS_INTAKE_CAPACITY", default_value_t = config::DEFAULT_INTAKE_CAPACITY)]
    pub intake_capacity: usize,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file used with --log
    #[arg(long, default_value = "rooms.log")]
    pub log_file: PathBuf,
}

impl ServeArgs {
    pub fn hub_config(&self) -> HubConfig {
        HubConfig::new(self.queue_capacity, self.intake_capacity)
    }
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let pool = rooms_redis::init_pool(&args.redis_url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", args.redis_url))?;

    let hub = Hub::spawn(args.hub_config());
    let state = AppState::new(
        Arc::new(RedisMessageService::new(pool.clone())),
        Arc::new(RedisRoomService::new(pool)),
        hub.clone(),
    );

    println!();
    println!("  {} {}", "Rooms".cyan().bold(), "Server".bold());
    println!();
    println!("  {}        http://{}:{}/api", "API".green(), args.host, args.port);
    println!(
        "  {}  ws://{}:{}/ws/rooms/{{room_id}}",
        "WebSocket".green(),
        args.host,
        args.port
    );
    println!("  {}      {}", "Redis".green(), args.redis_url);
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    let served = rooms_web::run_server(state, &args.host, args.port, shutdown_signal()).await;

    info!("Closing live connections");
    if hub.shutdown().await.is_err() {
        warn!("Hub had already stopped");
    }
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
