pub mod rank_order;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use dotenv::dotenv;
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
};

pub use rank_order::RankOrder;

#[derive(Debug, Clone, Parser, Default)]
pub struct Config {
    /// Which database file to use
    #[arg(long, default_value = "./microblog.db", env = "DATABASE")]
    database: PathBuf,
    /// Keep everything in memory instead of a database file
    #[arg(short, long)]
    memory: bool,
    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "PORT")]
    port: u16,
    /// Ranking used when a request does not pick one
    #[arg(short, long, default_value = "recent")]
    order: RankOrder,
    /// Skip inserting sample data into an empty store
    #[arg(long, name = "no-seed")]
    no_seed: bool,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Config {
    /// Parse the configuration from the environment and command line arguments
    pub fn parse() -> Self {
        dotenv().ok();
        <Self as Parser>::parse()
    }
    /// Create a logger with the configured verbosity level
    pub fn init_logger(&self) {
        env_logger::Builder::new()
            .filter_level(self.verbose.log_level_filter())
            .format_target(false)
            .init();
    }
    pub const fn database(&self) -> &PathBuf {
        &self.database
    }
    pub const fn memory(&self) -> bool {
        self.memory
    }
    pub fn address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
    pub const fn order(&self) -> RankOrder {
        self.order
    }
    pub const fn seed(&self) -> bool {
        !self.no_seed
    }
}
