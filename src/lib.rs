pub mod api;
pub mod config;
pub mod db;
pub mod ingest;
pub mod jobs;
pub mod logging;
pub mod meta;
pub mod notify;
pub mod report;
pub mod schema;
pub mod tmdb;

use std::sync::Arc;

use crate::config::Config;
use crate::db::Db;
use crate::notify::Notifier;
use crate::tmdb::TmdbClient;

/// Shared dependencies handed to every job. Constructed once at startup;
/// nothing in here is a process-global.
#[derive(Clone)]
pub struct JobContext {
    pub db: Db,
    pub cfg: Arc<Config>,
    pub tmdb: TmdbClient,
    pub notifier: Notifier,
}
