use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;

pub mod migrator;
pub mod repositories;

pub use repositories::activity::Activity;
pub use repositories::user::{CODE_LENGTH, User, UserRole, generate_code};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // An in-memory SQLite database is private to its connection, so the
        // pool must hold exactly one.
        let in_memory = db_url.contains(":memory:");
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn activity_repo(&self) -> repositories::activity::ActivityRepository {
        repositories::activity::ActivityRepository::new(self.conn.clone())
    }

    fn settings_repo(&self) -> repositories::settings::SettingsRepository {
        repositories::settings::SettingsRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn count_users(&self, filter: Option<&str>) -> Result<u64> {
        self.user_repo().count(filter).await
    }

    pub async fn list_users(
        &self,
        start: u64,
        count: u64,
        filter: Option<&str>,
    ) -> Result<Vec<User>> {
        self.user_repo().list(start, count, filter).await
    }

    pub async fn count_pending_signups(&self) -> Result<u64> {
        self.user_repo().count_pending_signups().await
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
        config: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo().create(username, password, role, config).await
    }

    pub async fn create_pending_user(&self, username: &str, activation_code: &str) -> Result<User> {
        self.user_repo().create_pending(username, activation_code).await
    }

    pub async fn activate_user(
        &self,
        code: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo().activate(code, password, config).await
    }

    pub async fn set_reset_code(&self, username: &str, code: &str) -> Result<bool> {
        self.user_repo().set_reset_code(username, code).await
    }

    pub async fn reset_user_password(
        &self,
        code: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo().reset_password(code, password, config).await
    }

    pub async fn set_user_enabled(&self, username: &str, enabled: bool) -> Result<()> {
        self.user_repo().set_enabled(username, enabled).await
    }

    pub async fn delete_user(&self, username: &str) -> Result<()> {
        self.user_repo().delete(username).await
    }

    // ========== Activities ==========

    pub async fn get_activities(&self, user_id: i32) -> Result<Vec<Activity>> {
        self.activity_repo().list_for_user(user_id).await
    }

    pub async fn add_activity(&self, user_id: i32, title: &str, color: &str) -> Result<Activity> {
        self.activity_repo().create(user_id, title, color).await
    }

    // ========== Settings ==========

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.settings_repo().get_value(key).await
    }

    pub async fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        self.settings_repo().put_value(key, value).await
    }

    /// Boolean feature-flag helper: a flag is on iff its value is "1"
    pub async fn flag_enabled(&self, key: &str) -> Result<bool> {
        Ok(self.get_setting(key).await?.as_deref() == Some("1"))
    }
}
