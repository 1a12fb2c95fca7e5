use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::staff::Actor;

/// Append-only activity log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor: &Actor, action: &str, entity: &str, entity_id: Option<Uuid>, details: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.username.clone(),
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id,
            details,
            at: Utc::now(),
        }
    }
}
