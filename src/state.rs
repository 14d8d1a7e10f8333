use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    auth::jwt::JwtService, config::AppConfig, db::PgPool, error::AppResult, mailer::Mailer,
};

pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, jwt: JwtService, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            jwt,
            mailer,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        Ok(self.pool.get()?)
    }
}
