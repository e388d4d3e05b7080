use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::dao::{StorageResult, UserStore};
use crate::errors::StorageError;
use crate::model::user::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str = r#"
        SELECT id, first_name, last_name, email, phone, password, date_of_birth, preference, created_at
        FROM   users
"#;

/// Postgres backed user store
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        PgUserStore { db }
    }

    async fn find_one(&self, filter: &str, value: &str) -> StorageResult<Option<User>> {
        let query = format!("{USER_COLUMNS} WHERE {filter} = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.db)
            .await?)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// Return the user matching the id
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, user_id: Uuid) -> StorageResult<Option<User>> {
        let query = format!("{USER_COLUMNS} WHERE id = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?)
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        self.find_one("email", email).await
    }

    #[instrument(skip(self))]
    async fn find_by_phone(&self, phone: &str) -> StorageResult<Option<User>> {
        self.find_one("phone", phone).await
    }

    /// Create a new user
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn insert(&self, user: NewUser) -> StorageResult<User> {
        let user = user.into_user(Uuid::new_v4());

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, phone, password, date_of_birth, preference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password)
        .bind(user.date_of_birth)
        .bind(&user.preference)
        .bind(user.created_at)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StorageError::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET first_name = $2, last_name = $3, preference = $4 WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.preference)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update a user's password
    #[instrument(skip(self, password_hash))]
    async fn update_password(&self, user_id: Uuid, password_hash: String) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET password = $1 WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
