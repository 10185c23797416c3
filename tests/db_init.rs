mod common;

use std::time::Duration;

use todo_rights::authz::{GrantStore, SqlStore};
use todo_rights::events::{spawn_audit_trail, verify_chain};
use todo_rights::{DbConfig, EntityRef, GrantSubject, PermissionLevel, Principal, RightsConfig, RightsEngine};

fn config_for(dir: &tempfile::TempDir) -> DbConfig {
    DbConfig {
        database_url: format!("sqlite://{}", dir.path().join("rights.db").display()),
        max_connections: 2,
        acquire_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn init_creates_and_migrates_an_on_disk_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir);

    let pool = todo_rights::db::init(&config).await.unwrap();
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(applied, todo_rights::db::MIGRATOR.iter().count() as i64);
    pool.close().await;

    // Running again is a no-op
    let pool = todo_rights::db::init(&config).await.unwrap();
    let store = SqlStore::new(pool.clone());
    assert!(store.grants_on(EntityRef::project(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn audit_trail_persists_grant_changes() {
    let dir = tempfile::tempdir().unwrap();
    let pool = todo_rights::db::init(&config_for(&dir)).await.unwrap();
    common::seed_tree(&pool).await;

    let config = RightsConfig::default();
    let bus = spawn_audit_trail(&config, pool.clone());
    let engine = RightsEngine::new(SqlStore::new(pool.clone()), config).with_events(bus);

    engine
        .share(&Principal::user(1), EntityRef::project(1), GrantSubject::User(2), PermissionLevel::Read)
        .await
        .unwrap();
    engine.unshare(&Principal::user(1), EntityRef::project(1), GrantSubject::User(2)).await.unwrap();

    // The listener runs in the background
    let mut persisted = 0;
    for _ in 0..50 {
        persisted = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM grant_events")
            .fetch_one(&pool)
            .await
            .unwrap();
        if persisted == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(persisted, 2);
    assert_eq!(verify_chain(&pool).await.unwrap(), None);
}
