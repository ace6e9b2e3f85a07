pub mod api;
pub mod config;
pub mod db;
pub mod uploads;
pub mod utils;

pub use db::DbPool;

use config::Config;
use uploads::ImageStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub uploads: ImageStore,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, uploads: ImageStore) -> Self {
        Self {
            config,
            db,
            uploads,
        }
    }
}
