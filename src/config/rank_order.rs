use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Hash, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RankOrder {
    /// Newest posts first
    #[default]
    Recent,
    /// Most liked posts first
    Popular,
}

impl fmt::Display for RankOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Recent => write!(f, "recent"),
            Self::Popular => write!(f, "popular"),
        }
    }
}
