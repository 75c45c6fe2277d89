pub mod changes;
pub mod client;
pub mod export;
pub mod gate;
pub mod models;

pub use client::{TmdbClient, TmdbError};
pub use gate::RequestGate;

/// The two record families mirrored from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Movie,
    Series,
}

impl Family {
    /// Path segment on the API ("/3/movie/..", "/3/tv/..").
    pub fn endpoint(self) -> &'static str {
        match self {
            Family::Movie => "movie",
            Family::Series => "tv",
        }
    }

    /// Prefix of the daily id-export file.
    pub fn export_kind(self) -> &'static str {
        match self {
            Family::Movie => "movie",
            Family::Series => "tv_series",
        }
    }

    pub fn root_table(self) -> &'static str {
        match self {
            Family::Movie => "movie",
            Family::Series => "series",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Family::Movie => "movie",
            Family::Series => "series",
        }
    }
}
