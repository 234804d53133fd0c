use std::{fs, sync::Arc};

use tracing::info;

use crate::{
    configuration::Config,
    dao::{get_path, PoolOption, PoolType},
    error::Error,
    model::{Subscription, Table},
};

#[derive(Debug)]
pub struct DatabasePool {
    pub subscription: Arc<Table<Subscription>>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(config.database_max_connections)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            subscription: Arc::new(Table::new(pool.clone())),
            pool,
        })
    }

    pub async fn init_migrations(&self) -> Result<(), Error> {
        let files = ["push_subscription.sql"];
        let dir = env!("CARGO_MANIFEST_DIR");

        for file in files {
            let path = get_path(dir, file);
            let data = fs::read_to_string(&path)?;
            sqlx::raw_sql(&data).execute(&self.pool).await?;
            info!("Applied schema {}", path.display());
        }

        Ok(())
    }

    pub fn get_pool(&self) -> &PoolType {
        &self.pool
    }
}
