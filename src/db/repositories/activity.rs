use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entities::activities;

/// Activity data returned from the repository
#[derive(Debug, Clone)]
pub struct Activity {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub color: String,
    pub created_at: String,
}

impl From<activities::Model> for Activity {
    fn from(model: activities::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            color: model.color,
            created_at: model.created_at,
        }
    }
}

pub struct ActivityRepository {
    conn: DatabaseConnection,
}

impl ActivityRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// All activities owned by one user, ordered by title
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Activity>> {
        let activities = activities::Entity::find()
            .filter(activities::Column::UserId.eq(user_id))
            .order_by_asc(activities::Column::Title)
            .all(&self.conn)
            .await
            .context("Failed to list activities")?;

        Ok(activities.into_iter().map(Activity::from).collect())
    }

    pub async fn create(&self, user_id: i32, title: &str, color: &str) -> Result<Activity> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = activities::ActiveModel {
            user_id: Set(user_id),
            title: Set(title.to_string()),
            color: Set(color.to_string()),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert activity")?;

        Ok(Activity::from(model))
    }
}
