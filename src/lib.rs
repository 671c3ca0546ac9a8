pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod notifications;

pub use db::DbPool;

use config::Config;
use notifications::Notifier;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            db,
            notifier,
        }
    }
}
