use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;

/// Length of activation and reset codes. Codes are drawn at this length
/// directly from the generator, so the full ~119 bits of a 20-character
/// alphanumeric string are kept.
pub const CODE_LENGTH: usize = 20;

/// Closed two-value role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Normal,
    Administrator,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Administrator => "administrator",
        }
    }

    /// Anything that is not exactly "administrator" is a normal user.
    #[must_use]
    pub fn parse(role: &str) -> Self {
        if role == "administrator" {
            Self::Administrator
        } else {
            Self::Normal
        }
    }
}

/// User data returned from the repository (without the password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: UserRole,
    pub enabled: bool,
    pub activated_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            role: UserRole::parse(&model.role),
            enabled: model.enabled,
            activated_at: model.activated_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Count users, restricted to usernames containing `filter` when given
    pub async fn count(&self, filter: Option<&str>) -> Result<u64> {
        let mut query = users::Entity::find();

        if let Some(filter) = filter {
            query = query.filter(users::Column::Username.contains(filter));
        }

        query.count(&self.conn).await.context("Failed to count users")
    }

    /// One page of users ordered by username, offset `start`, at most `count`
    pub async fn list(&self, start: u64, count: u64, filter: Option<&str>) -> Result<Vec<User>> {
        let mut query = users::Entity::find().order_by_asc(users::Column::Username);

        if let Some(filter) = filter {
            query = query.filter(users::Column::Username.contains(filter));
        }

        let users = query
            .offset(start)
            .limit(count)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    /// Number of signups still waiting for activation
    pub async fn count_pending_signups(&self) -> Result<u64> {
        users::Entity::find()
            .filter(users::Column::ActivationCode.is_not_null())
            .count(&self.conn)
            .await
            .context("Failed to count pending signups")
    }

    /// Create an immediately active account (admin console)
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
        config: &SecurityConfig,
    ) -> Result<User> {
        let password = password.to_string();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            role: Set(role.as_str().to_string()),
            enabled: Set(true),
            activated_at: Set(Some(now.clone())),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    /// Create a signup record waiting for activation. The account has no
    /// password yet and cannot log in until the code is redeemed.
    pub async fn create_pending(&self, username: &str, activation_code: &str) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(String::new()),
            role: Set(UserRole::Normal.as_str().to_string()),
            enabled: Set(true),
            activation_code: Set(Some(activation_code.to_string())),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert pending user")?;

        Ok(User::from(model))
    }

    /// Verify password for a user
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            // Pending signups carry an empty hash; treat any unparseable
            // hash as a failed verification, not a fault.
            let Ok(parsed_hash) = PasswordHash::new(&password_hash) else {
                return false;
            };

            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok()
        })
        .await
        .context("Password verification task panicked")?;

        Ok(is_valid)
    }

    /// Redeem an activation code: set the password, clear the code and stamp
    /// the activation time. Returns `None` when no pending user carries the
    /// code.
    pub async fn activate(
        &self,
        code: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::ActivationCode.eq(code))
            .one(&self.conn)
            .await
            .context("Failed to query user by activation code")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password = password.to_string();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.activation_code = Set(None);
        active.activated_at = Set(Some(now.clone()));
        active.enabled = Set(true);
        active.updated_at = Set(now);
        let model = active
            .update(&self.conn)
            .await
            .context("Failed to activate user")?;

        Ok(Some(User::from(model)))
    }

    /// Store a password-reset code. Returns `false` when the user is unknown.
    pub async fn set_reset_code(&self, username: &str, code: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for reset code")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.reset_code = Set(Some(code.to_string()));
        active.updated_at = Set(now);
        active
            .update(&self.conn)
            .await
            .context("Failed to store reset code")?;

        Ok(true)
    }

    /// Redeem a reset code and replace the password hash. Returns `None`
    /// when no user carries the code.
    pub async fn reset_password(
        &self,
        code: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::ResetCode.eq(code))
            .one(&self.conn)
            .await
            .context("Failed to query user by reset code")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password = password.to_string();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.reset_code = Set(None);
        active.updated_at = Set(now);
        let model = active
            .update(&self.conn)
            .await
            .context("Failed to reset password")?;

        Ok(Some(User::from(model)))
    }

    /// Set the enabled flag. Writing the current value again is fine, so
    /// enabling or disabling twice is idempotent.
    pub async fn set_enabled(&self, username: &str, enabled: bool) -> Result<()> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for enable/disable")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {username}"))?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.enabled = Set(enabled);
        active.updated_at = Set(now);
        active
            .update(&self.conn)
            .await
            .context("Failed to update enabled flag")?;

        Ok(())
    }

    /// Delete a user and every activity they own
    pub async fn delete(&self, username: &str) -> Result<()> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for deletion")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {username}"))?;

        crate::entities::activities::Entity::delete_many()
            .filter(crate::entities::activities::Column::UserId.eq(user.id))
            .exec(&self.conn)
            .await
            .context("Failed to delete user activities")?;

        users::Entity::delete_by_id(user.id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(())
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a random activation/reset code: `CODE_LENGTH` characters drawn
/// from the URL-safe alphanumeric alphabet out of a CSPRNG.
#[must_use]
pub fn generate_code() -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(UserRole::parse("administrator"), UserRole::Administrator);
        assert_eq!(UserRole::parse("normal"), UserRole::Normal);
        assert_eq!(UserRole::parse("anything else"), UserRole::Normal);
        assert_eq!(UserRole::parse(UserRole::Administrator.as_str()), UserRole::Administrator);
    }

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_codes_differ() {
        assert_ne!(generate_code(), generate_code());
    }
}
