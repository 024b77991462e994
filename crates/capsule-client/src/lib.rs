pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod focus;
pub mod gallery;
pub mod gate;
pub mod session;
pub mod sync;

use std::sync::Arc;

use capsule_media::CpalInput;
use capsule_shared::constants::APP_NAME;
use capsule_presence::LanyardClient;
use capsule_store::{ContentStore, MemoryStore, RestStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::commands::{Command, HELP};
use crate::config::ClientConfig;
use crate::session::Capsule;

pub use error::{DownloadError, SyncError, ValidationError};
pub use sync::{ContentState, ContentSync, GalleryView, RefreshReport};

pub async fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("capsule=debug,capsule_client=debug,capsule_store=info,capsule_presence=info,capsule_media=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();

    let store: Arc<dyn ContentStore> = match &config.store_url {
        Some(url) => {
            info!(url = %url, "Using remote content store");
            Arc::new(RestStore::new(url, &config.store_key, config.request_timeout)?)
        }
        None => {
            warn!("SUPABASE_URL not set, content is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    let presence = Arc::new(LanyardClient::new(
        &config.presence_url,
        config.request_timeout,
    )?);
    let input = Arc::new(CpalInput::default());

    let mut capsule = Capsule::new(config, store, presence, input)?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut transfers = JoinSet::new();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => match commands::detach(&capsule, &command) {
                        Some(job) => {
                            transfers.spawn(job);
                            println!("Working on it...");
                        }
                        None => {
                            let output = commands::execute(&mut capsule, command).await;
                            if !output.is_empty() {
                                println!("{output}");
                            }
                        }
                    },
                    Err(usage) => println!("{usage}"),
                }
            }
            Some(done) = transfers.join_next() => match done {
                Ok(output) => println!("{output}"),
                Err(e) => warn!(error = %e, "Transfer task failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    while let Some(done) = transfers.join_next().await {
        if let Ok(output) = done {
            println!("{output}");
        }
    }
    capsule.shutdown().await;
    Ok(())
}
