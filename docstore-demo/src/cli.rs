use clap::Parser;
use docstore::config::{DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_URI, StoreConfig};

/// Inserts sample users into a document database and runs query examples against them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connection string of the database server
    #[arg(long, env = "DOCSTORE_URI", default_value = DEFAULT_URI)]
    pub uri: String,

    /// Logical database to use
    #[arg(long, env = "DOCSTORE_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Collection the users are stored in
    #[arg(long, env = "DOCSTORE_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Identifier to look up in the find-by-id example (defaults to the first inserted user)
    #[arg(long)]
    pub lookup_id: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.uri, &self.database).with_collection(&self.collection)
    }
}
