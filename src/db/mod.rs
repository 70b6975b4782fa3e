//! Persistence for users, groups and memberships.
//!
//! Services talk to the `UserRepo`, `GroupRepo` and `MembershipRepo` traits;
//! [`DbPool`] picks the SQLite or PostgreSQL implementations at startup.

mod error;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, any(feature = "database-sqlite", feature = "database-postgres")))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Connection pools behind a [`DbPool`].
enum Backend {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    /// Writes and migrations go to `primary`; reads to `replica` when set.
    #[cfg(feature = "database-postgres")]
    Postgres {
        primary: sqlx::PgPool,
        replica: Option<sqlx::PgPool>,
    },
    /// Built without any database feature; cannot be constructed.
    #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
    Disabled(std::convert::Infallible),
}

/// Open database plus the repositories over it.
///
/// Repositories are built once here and shared as `Arc<dyn _>`.
pub struct DbPool {
    backend: Backend,
    users: Arc<dyn UserRepo>,
    groups: Arc<dyn GroupRepo>,
    memberships: Arc<dyn MembershipRepo>,
}

impl DbPool {
    /// Wrap an already-open SQLite pool.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        Self {
            users: Arc::new(sqlite::SqliteUserRepo::new(pool.clone())),
            groups: Arc::new(sqlite::SqliteGroupRepo::new(pool.clone())),
            memberships: Arc::new(sqlite::SqliteMembershipRepo::new(pool.clone())),
            backend: Backend::Sqlite(pool),
        }
    }

    /// Wrap already-open PostgreSQL pools.
    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(primary: sqlx::PgPool, replica: Option<sqlx::PgPool>) -> Self {
        Self {
            users: Arc::new(postgres::PostgresUserRepo::new(
                primary.clone(),
                replica.clone(),
            )),
            groups: Arc::new(postgres::PostgresGroupRepo::new(
                primary.clone(),
                replica.clone(),
            )),
            memberships: Arc::new(postgres::PostgresMembershipRepo::new(
                primary.clone(),
                replica.clone(),
            )),
            backend: Backend::Postgres { primary, replica },
        }
    }

    /// Open the configured database. Does not run migrations.
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(cfg.connect_options())
                    .await?;
                tracing::info!(path = %cfg.path, wal = cfg.wal_mode, "Opened SQLite database");
                Ok(Self::from_sqlite(pool))
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let primary = cfg.pool_options().connect(&cfg.url).await?;
                let replica = match &cfg.read_url {
                    Some(url) => Some(cfg.pool_options().connect(url).await?),
                    None => None,
                };
                tracing::info!(
                    url = %cfg.redacted_url(),
                    replica = replica.is_some(),
                    "Connected to PostgreSQL"
                );
                Ok(Self::from_postgres(primary, replica))
            }
        }
    }

    /// Apply pending migrations from `migrations_sqlx/<backend>`.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.backend {
            #[cfg(feature = "database-sqlite")]
            Backend::Sqlite(pool) => {
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
            }
            #[cfg(feature = "database-postgres")]
            Backend::Postgres { primary, .. } => {
                sqlx::migrate!("./migrations_sqlx/postgres")
                    .run(primary)
                    .await?;
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            Backend::Disabled(never) => match *never {},
        }
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub fn users(&self) -> Arc<dyn UserRepo> {
        Arc::clone(&self.users)
    }

    pub fn groups(&self) -> Arc<dyn GroupRepo> {
        Arc::clone(&self.groups)
    }

    /// Group membership edges, the only store of who belongs where.
    pub fn memberships(&self) -> Arc<dyn MembershipRepo> {
        Arc::clone(&self.memberships)
    }

    /// Round-trip a trivial query on every pool.
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.backend {
            #[cfg(feature = "database-sqlite")]
            Backend::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            #[cfg(feature = "database-postgres")]
            Backend::Postgres { primary, replica } => {
                sqlx::query("SELECT 1").execute(primary).await?;
                if let Some(replica) = replica {
                    sqlx::query("SELECT 1").execute(replica).await?;
                }
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            Backend::Disabled(never) => match *never {},
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod pool_tests {
    use super::*;
    use crate::config::SqliteConfig;

    #[tokio::test]
    async fn test_from_config_requires_database() {
        let err = DbPool::from_config(&DatabaseConfig::None).await.err();
        assert!(matches!(err, Some(DbError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_open_migrate_and_ping_sqlite_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scim.db");
        let config = DatabaseConfig::Sqlite(SqliteConfig {
            path: path.to_string_lossy().into_owned(),
            create_if_missing: true,
            run_migrations: true,
            wal_mode: true,
            busy_timeout_ms: 5000,
            max_connections: 2,
        });

        let db = DbPool::from_config(&config).await.unwrap();
        db.run_migrations().await.unwrap();
        // Idempotent
        db.run_migrations().await.unwrap();
        db.health_check().await.unwrap();

        assert!(path.exists());
        assert!(db.memberships().list_all().await.unwrap().is_empty());
    }
}
