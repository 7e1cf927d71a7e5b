mod cli;
mod runner;

use anyhow::Result;
use clap::Parser;
use docstore::{mongodb::MongoDbConnector, store::DataStore};
use tracing::{Level, info};

use crate::{cli::Cli, runner::run_all_examples};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = args.store_config();
    info!(database = %config.database, collection = %config.collection, "Using store");

    let store = DataStore::new(MongoDbConnector::from_config(&config), &config.collection);
    let summary = run_all_examples(&store, args.lookup_id.as_deref()).await?;

    if !summary.failed.is_empty() {
        info!(failed = ?summary.failed, "Some examples failed");
    }

    Ok(())
}
