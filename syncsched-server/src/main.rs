//! Syncsched Server binary
//!
//! Serves the scheduler operations API over an in-memory config store and task
//! runner. Production deployments plug their own `ConfigStore`/`TaskRunner`
//! implementations into `SchedulerServer` instead.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use syncsched::config::SchedulerConfig;
use syncsched::runner::MemoryTaskRunner;
use syncsched::scheduler::SyncScheduler;
use syncsched::store::MemoryConfigStore;
use syncsched_server::SchedulerServer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialize logging
  tracing_subscriber::registry()
    .with(fmt::layer())
    .with(
      EnvFilter::from_default_env()
        .add_directive("syncsched_server=info".parse()?)
        .add_directive("syncsched=info".parse()?),
    )
    .init();

  // Get address from environment or use default
  let addr = std::env::var("SYNCSCHED_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
  let socket = SocketAddr::from_str(&addr)?;
  info!("Starting syncsched-server on {}", addr);

  let store = Arc::new(MemoryConfigStore::new());
  let runner = Arc::new(MemoryTaskRunner::new());
  let scheduler = SyncScheduler::new(store, runner.clone(), SchedulerConfig::default());

  let server = SchedulerServer::new(socket, scheduler, runner);
  server.run().await?;

  Ok(())
}
