use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>, redis_url: Option<String>) -> Self {
        Self {
            database_url: database_url.into(),
            redis_url,
            max_connections: 10,
            connect_timeout_seconds: 30,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }
}
