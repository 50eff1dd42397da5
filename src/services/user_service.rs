use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, Set,
};

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolve a username inside a batch transaction, creating the row on
    /// first play. `last_played_at` is refreshed either way.
    pub async fn get_or_create_tx(
        &self,
        txn: &DatabaseTransaction,
        username: &str,
        now: DateTime<Utc>,
    ) -> AppResult<users::Model> {
        if let Some(user) = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(txn)
            .await?
        {
            let mut am = user.into_active_model();
            am.last_played_at = Set(Some(now));
            am.updated_at = Set(Some(now));
            let updated = am.update(txn).await?;
            return Ok(updated);
        }

        log::info!("Creating new user: {username}");
        let created = users::ActiveModel {
            username: Set(username.to_string()),
            is_active: Set(true),
            last_played_at: Set(Some(now)),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        Ok(created)
    }

    pub async fn get_user(&self, id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {id}")))
    }

    pub async fn get_user_by_username(&self, username: &str) -> AppResult<users::Model> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {username}")))
    }
}
