use crate::config::Config;
use crate::db::connection::DbPool;

/// Shared application state handed to handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        Self { pool, config }
    }
}
