//! crawlq - durable lease-based crawl queue node.

mod cli;
mod logging;
mod node;
mod shutdown;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crawlq_config::{ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands};
use crate::node::Node;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    cli.overrides.apply(&mut config);
    if let Some(Commands::Run { workers, api, host, port }) = &cli.command {
        if let Some(workers) = workers {
            config.crawler.workers = *workers;
        }
        if *api {
            config.api.enabled = true;
        }
        if let Some(host) = host {
            config.api.host = host.clone();
        }
        if let Some(port) = port {
            config.api.port = *port;
        }
    }

    logging::init_tracing(&config.logging)?;

    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!("{}: {}", warning.path, warning.message);
    }

    let node = Node::open(config).await?;
    let result = match cli.command {
        None | Some(Commands::Run { .. }) => {
            info!("Starting crawlq v{}", env!("CARGO_PKG_VERSION"));
            let token = CancellationToken::new();
            shutdown::install(token.clone())?;
            node.run(token).await
        }
        Some(Commands::Status) => node.status_report().await.map(|report| {
            println!("{}", report);
        }),
        Some(Commands::Seed) => node.seed().await.map(|count| {
            println!("Enqueued {} seed tasks", count);
        }),
    };
    node.close().await;
    result
}
