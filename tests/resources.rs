mod common;

use chrono::Utc;
use sqlx::SqlitePool;

use todo_rights::models::{
    Attachment, Comment, Label, LabelTask, LinkShare, LinkShareCreateRequest, Namespace, Project, Reminder,
    TaskRelation, Task, Team, User,
};
use todo_rights::{AuthContext, AuthzError, EntityRef, GrantSubject, PermissionLevel, Principal, Rights};

const OWNER: i64 = 1;
const OUTSIDER: i64 = 2;

#[sqlx::test]
async fn loaded_records_answer_capability_checks(pool: SqlitePool) {
    common::seed_tree(&pool).await;
    let engine = common::engine(&pool);
    let owner = Principal::user(OWNER);
    let outsider = Principal::user(OUTSIDER);

    let namespace = Namespace::find(&pool, 1).await.unwrap().unwrap();
    let project = Project::find(&pool, 1).await.unwrap().unwrap();
    let task = Task::find(&pool, 1).await.unwrap().unwrap();
    assert!(!project.is_default);
    assert!(task.deleted_at.is_none());

    assert!(namespace.can_update(&engine, &owner).await.unwrap());
    assert!(project.can_create(&engine, &owner).await.unwrap());
    assert!(task.can_delete(&engine, &owner).await.unwrap());

    assert!(!namespace.can_read(&engine, &outsider).await.unwrap());
    assert!(!project.can_create(&engine, &outsider).await.unwrap());
    assert!(!task.can_update(&engine, &outsider).await.unwrap());

    // Anyone registered may create a namespace of their own
    assert!(namespace.can_create(&engine, &outsider).await.unwrap());
}

#[sqlx::test]
async fn comment_author_owns_their_comment(pool: SqlitePool) {
    common::seed_tree(&pool).await;
    let engine = common::engine(&pool);
    engine
        .share(&Principal::user(OWNER), EntityRef::project(1), GrantSubject::User(OUTSIDER), PermissionLevel::Read)
        .await
        .unwrap();
    common::comment(&pool, 2, 1, OUTSIDER).await;

    let comment: Comment = sqlx::query_as("SELECT id, task_id, author_id, comment, created_at FROM task_comments WHERE id = 2")
        .fetch_one(&pool)
        .await
        .unwrap();
    let outsider = Principal::user(OUTSIDER);

    assert!(comment.can_read(&engine, &outsider).await.unwrap());
    assert!(comment.can_update(&engine, &outsider).await.unwrap());
    assert!(comment.can_delete(&engine, &outsider).await.unwrap());
    // Read on the task is not enough to add another
    assert!(!comment.can_create(&engine, &outsider).await.unwrap());

    let owners_comment: Comment = sqlx::query_as("SELECT id, task_id, author_id, comment, created_at FROM task_comments WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!owners_comment.can_update(&engine, &outsider).await.unwrap());
}

#[sqlx::test]
async fn attachments_and_reminders_follow_their_task(pool: SqlitePool) {
    common::seed_tree(&pool).await;
    sqlx::query("INSERT INTO task_attachments (id, task_id, created_by_id, file_name) VALUES (1, 1, 1, 'plan.pdf')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO task_reminders (id, task_id, reminder_at) VALUES (1, 1, '2025-06-01T09:00:00Z')")
        .execute(&pool)
        .await
        .unwrap();
    let engine = common::engine(&pool);
    let outsider = Principal::user(OUTSIDER);

    let attachment: Attachment = sqlx::query_as("SELECT id, task_id, created_by_id, file_name, created_at FROM task_attachments WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    let reminder: Reminder = sqlx::query_as("SELECT id, task_id, reminder_at FROM task_reminders WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert!(!attachment.can_read(&engine, &outsider).await.unwrap());
    assert!(!reminder.can_read(&engine, &outsider).await.unwrap());

    engine
        .share(&Principal::user(OWNER), EntityRef::project(1), GrantSubject::User(OUTSIDER), PermissionLevel::Write)
        .await
        .unwrap();

    assert!(attachment.can_delete(&engine, &outsider).await.unwrap());
    assert!(reminder.can_update(&engine, &outsider).await.unwrap());
    assert!(reminder.can_create(&engine, &outsider).await.unwrap());
}

#[sqlx::test]
async fn attaching_a_label_needs_label_visibility_and_task_edit(pool: SqlitePool) {
    common::seed_tree(&pool).await;
    common::user(&pool, 3).await;
    common::label(&pool, 1, 3).await;
    common::label(&pool, 2, OUTSIDER).await;
    let engine = common::engine(&pool);
    let outsider = Principal::user(OUTSIDER);

    let foreign_label = LabelTask { id: 0, label_id: 1, task_id: 1 };
    let own_label = LabelTask { id: 0, label_id: 2, task_id: 1 };

    // No write on the task yet
    assert!(!own_label.can_create(&engine, &outsider).await.unwrap());

    engine
        .share(&Principal::user(OWNER), EntityRef::project(1), GrantSubject::User(OUTSIDER), PermissionLevel::Write)
        .await
        .unwrap();

    assert!(own_label.can_create(&engine, &outsider).await.unwrap());
    // Label 1 is invisible to the outsider
    assert!(!foreign_label.can_create(&engine, &outsider).await.unwrap());

    common::attach_label(&pool, 5, 2, 1).await;
    let attached = LabelTask { id: 5, label_id: 2, task_id: 1 };
    assert!(attached.can_read(&engine, &outsider).await.unwrap());
    assert!(attached.can_delete(&engine, &outsider).await.unwrap());

    // The task owner may detach a label they cannot edit
    assert!(attached.can_delete(&engine, &Principal::user(OWNER)).await.unwrap());
    let label = Label::find(&pool, 2).await.unwrap().unwrap();
    assert!(!label.can_update(&engine, &Principal::user(OWNER)).await.unwrap());
    assert!(label.can_read(&engine, &Principal::user(OWNER)).await.unwrap());
}

#[sqlx::test]
async fn relations_need_access_to_both_tasks(pool: SqlitePool) {
    common::seed_tree(&pool).await;
    common::namespace(&pool, 2, OUTSIDER).await;
    common::project(&pool, 2, 2, OUTSIDER).await;
    common::task(&pool, 2, 2, OUTSIDER).await;
    let engine = common::engine(&pool);
    let owner = Principal::user(OWNER);

    let relation = TaskRelation {
        id: 0,
        task_id: 1,
        other_task_id: 2,
        relation_kind: "blocking".to_string(),
        created_by_id: OWNER,
        created_at: Utc::now(),
    };

    assert!(!relation.can_create(&engine, &owner).await.unwrap());

    engine
        .share(&Principal::user(OUTSIDER), EntityRef::project(2), GrantSubject::User(OWNER), PermissionLevel::Read)
        .await
        .unwrap();
    assert!(relation.can_create(&engine, &owner).await.unwrap());
    assert!(relation.can_delete(&engine, &owner).await.unwrap());

    // Read on the source task is not enough
    let reverse = TaskRelation {
        task_id: 2,
        other_task_id: 1,
        ..relation.clone()
    };
    assert!(!reverse.can_create(&engine, &owner).await.unwrap());
}

#[sqlx::test]
async fn link_shares_are_managed_by_project_admins(pool: SqlitePool) {
    common::seed_tree(&pool).await;
    let engine = common::engine(&pool);
    let owner = Principal::user(OWNER);
    let outsider = Principal::user(OUTSIDER);

    let request = LinkShareCreateRequest {
        project_id: 1,
        level: PermissionLevel::Write,
        name: Some("board".to_string()),
    };
    request.validate().unwrap();
    let draft = request.draft(OWNER);

    assert!(draft.can_create(&engine, &owner).await.unwrap());
    assert!(!draft.can_create(&engine, &outsider).await.unwrap());

    let share = draft.insert(&pool).await.unwrap();
    assert_eq!(share.permission(), Some(PermissionLevel::Write));
    assert_eq!(LinkShare::find(&pool, share.id).await.unwrap().unwrap().hash, share.hash);

    engine
        .share(&owner, EntityRef::project(1), GrantSubject::User(OUTSIDER), PermissionLevel::Read)
        .await
        .unwrap();
    assert!(share.can_read(&engine, &outsider).await.unwrap());
    assert!(!share.can_delete(&engine, &outsider).await.unwrap());

    // Link-share principals never manage shares
    let principal = engine.resolve(&AuthContext::link_share(share.hash.clone())).await.unwrap();
    assert!(share.can_read(&engine, &principal).await.unwrap());
    assert!(!share.can_update(&engine, &principal).await.unwrap());

    let bad = LinkShareCreateRequest {
        project_id: 1,
        level: PermissionLevel::None,
        name: None,
    };
    assert!(matches!(bad.validate(), Err(AuthzError::InvalidLevel(_))));
}

#[sqlx::test]
async fn grant_records_need_admin_to_change(pool: SqlitePool) {
    common::seed_tree(&pool).await;
    let engine = common::engine(&pool);
    let owner = Principal::user(OWNER);
    let outsider = Principal::user(OUTSIDER);

    let grant = engine
        .share(&owner, EntityRef::project(1), GrantSubject::User(OUTSIDER), PermissionLevel::Write)
        .await
        .unwrap();

    assert!(grant.can_read(&engine, &outsider).await.unwrap());
    assert!(!grant.can_update(&engine, &outsider).await.unwrap());
    assert!(!grant.can_delete(&engine, &outsider).await.unwrap());
    assert!(grant.can_delete(&engine, &owner).await.unwrap());
}

#[sqlx::test]
async fn identity_records_load(pool: SqlitePool) {
    common::user(&pool, 1).await;
    common::inactive_user(&pool, 2).await;
    common::team(&pool, 10, &[1, 2]).await;

    let pending = User::find(&pool, 2).await.unwrap().unwrap();
    assert!(!pending.is_active);
    assert!(User::find(&pool, 3).await.unwrap().is_none());

    let members = Team::members(&pool, 10).await.unwrap();
    assert_eq!(members.iter().map(|m| m.user_id).collect::<Vec<_>>(), [1, 2]);

    let engine = common::engine(&pool);
    assert!(matches!(
        engine.resolve(&AuthContext::user(2)).await,
        Err(AuthzError::PrincipalInactive(_))
    ));
}
