use crate::audit::{self, Change};
use crate::db::connection::DbPool;
use crate::db::models::{Poll, Question, Vote};
use crate::db::repositories as repo;
use crate::db::store::{Store, StoreError};
use chrono::Utc;

/// PostgreSQL-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Database(err),
    }
}

impl Store for PgStore {
    async fn polls(&self) -> Result<Vec<Poll>, StoreError> {
        Ok(repo::get_all_polls(&self.pool).await?)
    }

    async fn find_poll(&self, id: i32) -> Result<Option<Poll>, StoreError> {
        Ok(repo::get_poll(&self.pool, id).await?)
    }

    async fn insert_poll(&self, poll: Poll, actor: &str) -> Result<Poll, StoreError> {
        let mut poll = audit::stamp(poll, Change::Added, actor, Utc::now());
        poll.id = repo::create_poll(&self.pool, &poll).await?;
        Ok(poll)
    }

    async fn update_poll(&self, poll: Poll, actor: &str) -> Result<Poll, StoreError> {
        let poll = audit::stamp(poll, Change::Modified, actor, Utc::now());
        repo::update_poll(&self.pool, &poll).await.map_err(classify)?;
        Ok(poll)
    }

    async fn delete_poll(&self, id: i32) -> Result<(), StoreError> {
        Ok(repo::delete_poll(&self.pool, id).await?)
    }

    async fn questions(&self, poll_id: i32) -> Result<Vec<Question>, StoreError> {
        Ok(repo::get_questions(&self.pool, poll_id).await?)
    }

    async fn find_question(&self, poll_id: i32, id: i32) -> Result<Option<Question>, StoreError> {
        Ok(repo::get_question(&self.pool, poll_id, id).await?)
    }

    async fn question_content_exists(
        &self,
        poll_id: i32,
        content: &str,
        except: Option<i32>,
    ) -> Result<bool, StoreError> {
        Ok(repo::question_content_exists(&self.pool, poll_id, content, except).await?)
    }

    async fn insert_question(&self, question: Question, actor: &str) -> Result<Question, StoreError> {
        let question = audit::stamp(question, Change::Added, actor, Utc::now());
        repo::create_question(&self.pool, &question)
            .await
            .map_err(classify)
    }

    async fn update_question(&self, question: Question, actor: &str) -> Result<Question, StoreError> {
        let question = audit::stamp(question, Change::Modified, actor, Utc::now());
        repo::update_question(&self.pool, &question)
            .await
            .map_err(classify)
    }

    async fn has_voted(&self, poll_id: i32, user_id: &str) -> Result<bool, StoreError> {
        Ok(repo::user_has_voted(&self.pool, poll_id, user_id).await?)
    }

    async fn insert_vote(&self, vote: Vote) -> Result<Vote, StoreError> {
        repo::cast_vote(&self.pool, &vote)
            .await
            .map_err(classify)
    }
}
