use crate::audit::{AuditFields, Auditable};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Poll {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub starts_at: NaiveDate,
    pub ends_at: NaiveDate,
    pub is_published: bool,
    #[sqlx(flatten)]
    pub audit: AuditFields,
}

impl Poll {
    /// Whether voters can see the poll on `today`.
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        self.is_published && self.starts_at <= today && today <= self.ends_at
    }
}

impl Auditable for Poll {
    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: i32,
    pub poll_id: i32,
    pub content: String,
    pub is_active: bool,
    #[sqlx(flatten)]
    pub audit: AuditFields,
    #[sqlx(skip)]
    pub answers: Vec<Answer>,
}

impl Auditable for Question {
    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Answer {
    pub id: i32,
    pub question_id: i32,
    pub content: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: i32,
    pub poll_id: i32,
    pub user_id: String,
    pub submitted_on: DateTime<Utc>,
    #[sqlx(skip)]
    pub answers: Vec<VoteAnswer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoteAnswer {
    pub question_id: i32,
    pub answer_id: i32,
}

/// Case-insensitive, whitespace-trimmed form used to detect duplicated question content.
pub fn normalize_content(content: &str) -> String {
    content.trim().to_lowercase()
}
