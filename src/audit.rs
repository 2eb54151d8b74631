use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creator and updater metadata carried by polls and questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditFields {
    pub created_by_id: String,
    pub created_on: DateTime<Utc>,
    pub updated_by_id: Option<String>,
    pub updated_on: Option<DateTime<Utc>>,
}

pub trait Auditable {
    fn audit_mut(&mut self) -> &mut AuditFields;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Modified,
}

/// Attributes a pending save to `actor`. Called by the store right before it writes.
pub fn stamp<E: Auditable>(mut entity: E, change: Change, actor: &str, now: DateTime<Utc>) -> E {
    let audit = entity.audit_mut();
    match change {
        Change::Added => {
            audit.created_by_id = actor.to_string();
            audit.created_on = now;
        }
        Change::Modified => {
            audit.updated_by_id = Some(actor.to_string());
            audit.updated_on = Some(now);
        }
    }
    entity
}
