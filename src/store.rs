use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, DbErr};

/// Owns the process-wide database connection.
///
/// The connection is established once at startup and shared (via
/// [`Store::handle`]) by all request handling for the life of the
/// process. Connection failure at startup is fatal: callers are
/// expected to propagate the error and abort.
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    /// Connects to the database and verifies liveness with a ping.
    #[tracing::instrument(skip(db_url))]
    pub async fn connect(db_url: &str) -> Result<Self, DbErr> {
        let db = Database::connect(db_url).await?;
        db.ping().await?;
        tracing::info!("Connected to database");
        Ok(Self { db })
    }

    /// Creates the tasks table and its supporting indexes (`date`,
    /// `created_at`) if they do not exist yet. Safe to call on every
    /// startup.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_indexes(&self) -> Result<(), DbErr> {
        migration::Migrator::up(&self.db, None).await?;
        tracing::info!("Database schema and indexes are up to date");
        Ok(())
    }

    /// Returns a handle to the active connection.
    pub fn handle(&self) -> DatabaseConnection {
        self.db.clone()
    }

    /// Closes the connection. Called once at process shutdown.
    #[tracing::instrument(skip(self))]
    pub async fn close(self) -> Result<(), DbErr> {
        self.db.close().await?;
        tracing::info!("Database connection closed");
        Ok(())
    }
}
