//! Command line and environment configuration.

use clap::{Parser, Subcommand};

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Chicago beer catalog: import scraped beer lists and serve them over HTTP.
#[derive(Parser, Debug)]
#[command(name = "beer-finder")]
#[command(author, version, about)]
pub struct Config {
    /// SQLite database file
    #[arg(long = "database", env = "DATABASE_URL", default_value = "beers.db", global = true)]
    pub database_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Serve the search API
    Serve(ServeArgs),

    /// Create the schema and seed the style taxonomy
    Setup,

    /// Import JSON beer lists; directories are searched for *.json files
    Import {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Assign a category to every beer that has none
    Classify {
        /// Reclassify every beer, not only uncategorized ones
        #[arg(long)]
        all: bool,
    },
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct ServeArgs {
    /// IP address to listen on
    #[arg(long, env = "LISTEN_IP", default_value = "127.0.0.1")]
    pub listen_ip: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Maximum number of pooled database connections (1-64)
    #[arg(long, env = "DB_POOL_SIZE", default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=64))]
    pub pool_size: u32,
}

impl ServeArgs {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_ip, self.port)
    }
}
