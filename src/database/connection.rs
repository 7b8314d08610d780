use std::sync::Arc;
use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::DatabaseConfig;
use crate::error::AppResult;

use super::memory::{InMemoryRestaurantStore, InMemorySessionRepository};
use super::postgres::{PgRestaurantStore, PgSessionRepository};
use super::repository::{RestaurantConfigStore, SessionRepository};

pub type DbPool = DatabaseConnection;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let pool = Database::connect(options).await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    Migrator::up(pool, None).await?;
    Ok(())
}

/// 服务使用的两个存储句柄，启动时创建，随进程关闭释放
#[derive(Clone)]
pub struct Repositories {
    pub sessions: Arc<dyn SessionRepository>,
    pub restaurants: Arc<dyn RestaurantConfigStore>,
}

impl Repositories {
    pub fn in_memory(seed_demo: bool) -> Self {
        let restaurants = if seed_demo {
            InMemoryRestaurantStore::with_demo_data()
        } else {
            InMemoryRestaurantStore::new()
        };
        Self {
            sessions: Arc::new(InMemorySessionRepository::new()),
            restaurants: Arc::new(restaurants),
        }
    }

    pub fn postgres(pool: DbPool) -> Self {
        Self {
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
            restaurants: Arc::new(PgRestaurantStore::new(pool)),
        }
    }
}

/// 根据数据库 URL 选择存储实现；Postgres 会先执行迁移
pub async fn create_repositories(config: &DatabaseConfig) -> AppResult<Repositories> {
    if config.is_memory() {
        log::warn!(
            "Using in-memory storage, state is lost on restart and not shared between instances"
        );
        return Ok(Repositories::in_memory(config.seed_demo));
    }

    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(Repositories::postgres(pool))
}
