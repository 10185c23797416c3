#![allow(dead_code)]

use sqlx::SqlitePool;

use todo_rights::authz::SqlStore;
use todo_rights::{RightsConfig, RightsEngine};

pub fn engine(pool: &SqlitePool) -> RightsEngine<SqlStore> {
    RightsEngine::new(SqlStore::new(pool.clone()), RightsConfig::default())
}

pub async fn user(pool: &SqlitePool, id: i64) {
    insert_user(pool, id, true).await;
}

pub async fn inactive_user(pool: &SqlitePool, id: i64) {
    insert_user(pool, id, false).await;
}

async fn insert_user(pool: &SqlitePool, id: i64, is_active: bool) {
    sqlx::query("INSERT INTO users (id, username, email, is_active) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(format!("user{id}"))
        .bind(format!("user{id}@example.com"))
        .bind(is_active)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn team(pool: &SqlitePool, id: i64, members: &[i64]) {
    sqlx::query("INSERT INTO teams (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(format!("team{id}"))
        .execute(pool)
        .await
        .unwrap();
    for member in members {
        add_member(pool, id, *member).await;
    }
}

pub async fn add_member(pool: &SqlitePool, team_id: i64, user_id: i64) {
    sqlx::query("INSERT INTO team_members (team_id, user_id) VALUES (?, ?)")
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn remove_member(pool: &SqlitePool, team_id: i64, user_id: i64) {
    sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn namespace(pool: &SqlitePool, id: i64, owner_id: i64) {
    sqlx::query("INSERT INTO namespaces (id, title, owner_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(format!("namespace {id}"))
        .bind(owner_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn project(pool: &SqlitePool, id: i64, namespace_id: i64, owner_id: i64) {
    sqlx::query("INSERT INTO projects (id, namespace_id, owner_id, title) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(namespace_id)
        .bind(owner_id)
        .bind(format!("project {id}"))
        .execute(pool)
        .await
        .unwrap();
}

pub async fn task(pool: &SqlitePool, id: i64, project_id: i64, created_by_id: i64) {
    sqlx::query("INSERT INTO tasks (id, project_id, created_by_id, title) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(project_id)
        .bind(created_by_id)
        .bind(format!("task {id}"))
        .execute(pool)
        .await
        .unwrap();
}

pub async fn label(pool: &SqlitePool, id: i64, created_by_id: i64) {
    sqlx::query("INSERT INTO labels (id, title, created_by_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(format!("label {id}"))
        .bind(created_by_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn attach_label(pool: &SqlitePool, id: i64, label_id: i64, task_id: i64) {
    sqlx::query("INSERT INTO label_tasks (id, label_id, task_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(label_id)
        .bind(task_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn comment(pool: &SqlitePool, id: i64, task_id: i64, author_id: i64) {
    sqlx::query("INSERT INTO task_comments (id, task_id, author_id, comment) VALUES (?, ?, ?, 'hello')")
        .bind(id)
        .bind(task_id)
        .bind(author_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn link_share(pool: &SqlitePool, id: i64, hash: &str, project_id: i64, level: i64, shared_by_id: i64) {
    sqlx::query("INSERT INTO link_shares (id, hash, project_id, level, shared_by_id) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(hash)
        .bind(project_id)
        .bind(level)
        .bind(shared_by_id)
        .execute(pool)
        .await
        .unwrap();
}

/// Logically deletes a namespace and everything under it.
pub async fn delete_namespace(pool: &SqlitePool, id: i64) {
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("UPDATE namespaces SET deleted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query("UPDATE projects SET deleted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE namespace_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query(
        "UPDATE tasks SET deleted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE project_id IN (SELECT id FROM projects WHERE namespace_id = ?)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await
    .unwrap();
    tx.commit().await.unwrap();
}

/// Users 1 (owner) and 2 (outsider); namespace 1 > project 1 > task 1 > comment 1, all owned by user 1.
pub async fn seed_tree(pool: &SqlitePool) {
    user(pool, 1).await;
    user(pool, 2).await;
    namespace(pool, 1, 1).await;
    project(pool, 1, 1, 1).await;
    task(pool, 1, 1, 1).await;
    comment(pool, 1, 1, 1).await;
}
