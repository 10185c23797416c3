use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};

use crate::errors::AuthzResult;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub created_by_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub team_id: i64,
    pub user_id: i64,
    pub is_admin: bool,
}

impl Team {
    pub async fn members<'e, E>(ex: E, team_id: i64) -> AuthzResult<Vec<TeamMember>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let members = sqlx::query_as::<_, TeamMember>(
            "SELECT team_id, user_id, is_admin FROM team_members WHERE team_id = ? ORDER BY user_id",
        )
        .bind(team_id)
        .fetch_all(ex)
        .await?;
        Ok(members)
    }
}
