use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};

use crate::errors::AuthzResult;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    /// False until the account is confirmed
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub async fn find<'e, E>(ex: E, id: i64) -> AuthzResult<Option<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let user = sqlx::query_as::<_, User>("SELECT id, username, email, is_active, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(ex)
            .await?;
        Ok(user)
    }
}
