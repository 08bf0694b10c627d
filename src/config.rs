use std::time::Duration;

use clap::Parser;

use crate::api::DEFAULT_BASE_URL;
use crate::ingest::DEFAULT_BATCH_SIZE;

#[derive(Parser, Debug, Clone)]
#[clap(about, version, author)]
pub struct Args {
    /// People endpoint of the SWAPI server
    #[clap(long, env = "SWAPI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// SQLite database URL; the file is created if missing
    #[clap(long, env = "DATABASE_URL", default_value = "sqlite://swapi.db")]
    pub database_url: String,

    /// IDs fetched concurrently per window
    #[clap(short, long, env = "SWAPI_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE as u16,
        value_parser = clap::value_parser!(u16).range(1..))]
    pub batch_size: u16,

    /// Size of the database connection pool
    #[clap(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Per-request timeout; no timeout when unset
    #[clap(short, long, env = "SWAPI_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

impl Args {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
