//! Connection settings for a data store.

pub const DEFAULT_URI: &str = "mongodb://127.0.0.1:27017";
pub const DEFAULT_DATABASE: &str = "proj-1";
pub const DEFAULT_COLLECTION: &str = "users";

/// Where the store connects and which collection its operations target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Connection string of the database server.
    pub uri: String,
    /// Logical database selected on the server.
    pub database: String,
    /// Collection every record operation targets.
    pub collection: String,
}

impl StoreConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            collection: default_collection(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            collection: default_collection(),
        }
    }
}

fn default_uri() -> String {
    DEFAULT_URI.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_server() {
        let config = StoreConfig::default();
        assert_eq!(config.uri, "mongodb://127.0.0.1:27017");
        assert_eq!(config.database, "proj-1");
        assert_eq!(config.collection, "users");
    }

    #[test]
    fn builder_keeps_the_default_collection_unless_overridden() {
        let config = StoreConfig::new("mongodb://db:27017", "staging");
        assert_eq!(config.collection, DEFAULT_COLLECTION);

        let config = config.with_collection("admins");
        assert_eq!(config.database, "staging");
        assert_eq!(config.collection, "admins");
    }
}
