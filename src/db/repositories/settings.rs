use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::settings;

pub struct SettingsRepository {
    conn: DatabaseConnection,
}

impl SettingsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Read one setting; `None` when the key does not exist
    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let setting = settings::Entity::find_by_id(key)
            .one(&self.conn)
            .await
            .context("Failed to query setting")?;

        Ok(setting.map(|s| s.value))
    }

    /// Write one setting, inserting the key when it is new
    pub async fn put_value(&self, key: &str, value: &str) -> Result<()> {
        let existing = settings::Entity::find_by_id(key)
            .one(&self.conn)
            .await
            .context("Failed to query setting for update")?;

        match existing {
            Some(model) => {
                let mut active: settings::ActiveModel = model.into();
                active.value = Set(value.to_string());
                active
                    .update(&self.conn)
                    .await
                    .context("Failed to update setting")?;
            }
            None => {
                let active = settings::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(value.to_string()),
                };
                active
                    .insert(&self.conn)
                    .await
                    .context("Failed to insert setting")?;
            }
        }

        Ok(())
    }
}
