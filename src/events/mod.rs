//! Audit trail for permission changes.
//!
//! Grant mutations publish a [`DomainEvent`] on a broadcast bus, after the commit
//! when they run in a transaction. Publishing is fire-and-forget; [`start_audit_listener`] drains the bus into `grant_events`,
//! chaining each row to the previous one with SHA-256.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::RightsConfig;
use crate::errors::AuthzResult;

pub mod loggable;
pub use loggable::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(name: impl Into<String>, actor_id: Option<i64>, subject_id: Option<i64>, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            occurred_at: Utc::now(),
            actor_id,
            subject_id,
            payload,
        }
    }
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus(capacity: usize) -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(capacity.max(1))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPayload {
    #[serde(rename = "new")]
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    pub severity: Severity,
}

/// Publishes `<entity_type>.<action>` for `entity`.
pub fn log_activity<T: Loggable>(
    event_bus: &EventBus,
    action: &str,
    actor_id: Option<i64>,
    entity: &T,
    old_entity: Option<&T>,
) {
    // No receiver is not an error
    let _ = event_bus.send(activity_event(action, actor_id, entity, old_entity));
}

/// Builds the bus message for `<entity_type>.<action>` without sending it.
pub fn activity_event<T: Loggable>(action: &str, actor_id: Option<i64>, entity: &T, old_entity: Option<&T>) -> Value {
    let name = format!("{}.{}", T::entity_type(), action);
    let payload = AuditPayload {
        current: serde_json::to_value(entity).unwrap_or_default(),
        old: old_entity.map(|e| serde_json::to_value(e).unwrap_or_default()),
        severity: entity.severity_for_action(action),
    };

    let event = DomainEvent::new(
        name,
        actor_id,
        Some(entity.subject_id()),
        serde_json::to_value(&payload).unwrap_or_default(),
    );

    serde_json::to_value(event).unwrap_or_default()
}

fn chain_hash(prev_hash: Option<&str>, payload: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Appends one bus event to `grant_events` and returns its hash.
pub async fn persist_event(pool: &SqlitePool, event: &Value) -> AuthzResult<String> {
    let name = event.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
    let event_id = event
        .get("id")
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let actor_id = event.get("actor_id").and_then(|v| v.as_i64());
    let subject_id = event.get("subject_id").and_then(|v| v.as_i64());
    let occurred_at = event
        .get("occurred_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let severity = event
        .get("payload")
        .and_then(|p| p.get("severity"))
        .and_then(|s| s.as_str())
        .unwrap_or(Severity::Important.as_str());
    let payload = serde_json::to_string(event).unwrap_or_default();

    let mut tx = pool.begin().await?;

    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT hash FROM grant_events ORDER BY seq DESC LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
    let hash = chain_hash(prev_hash.as_deref(), &payload);

    sqlx::query(
        r#"
        INSERT INTO grant_events (event_id, event_name, actor_id, subject_id, occurred_at, payload, severity, prev_hash, hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event_id)
    .bind(name)
    .bind(actor_id)
    .bind(subject_id)
    .bind(occurred_at)
    .bind(&payload)
    .bind(severity)
    .bind(&prev_hash)
    .bind(&hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(hash)
}

/// Recomputes the hash chain. Returns the sequence number of the first broken row.
pub async fn verify_chain(pool: &SqlitePool) -> AuthzResult<Option<i64>> {
    let rows = sqlx::query("SELECT seq, payload, prev_hash, hash FROM grant_events ORDER BY seq")
        .fetch_all(pool)
        .await?;

    let mut expected_prev: Option<String> = None;
    for row in rows {
        let seq: i64 = row.try_get("seq")?;
        let payload: String = row.try_get("payload")?;
        let prev_hash: Option<String> = row.try_get("prev_hash")?;
        let hash: String = row.try_get("hash")?;

        if prev_hash != expected_prev || chain_hash(prev_hash.as_deref(), &payload) != hash {
            return Ok(Some(seq));
        }
        expected_prev = Some(hash);
    }

    Ok(None)
}

/// Creates a bus sized from `config` and persists everything published on it.
pub fn spawn_audit_trail(config: &RightsConfig, pool: SqlitePool) -> EventBus {
    let (bus, rx) = init_event_bus(config.audit_channel_capacity);
    tokio::spawn(start_audit_listener(rx, pool));
    bus
}

pub async fn start_audit_listener(mut rx: broadcast::Receiver<Value>, pool: SqlitePool) {
    tracing::info!("grant audit listener started");
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Err(e) = persist_event(&pool, &event).await {
                    tracing::error!("failed to persist grant event: {}", e);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "grant audit listener lagged behind the bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::info!("grant audit listener stopped");
}
