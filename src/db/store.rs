use crate::db::models::{Poll, Question, Vote};
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule rejected the write.
    #[error("record conflicts with an existing one")]
    Conflict,
    /// The row to update was removed after it was read.
    #[error("record no longer exists")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence gateway for polls, questions and votes.
///
/// Every write is atomic: either all of its rows commit or none do. Writes of
/// auditable entities take the acting user's id and stamp it before saving.
pub trait Store: Send + Sync + 'static {
    fn polls(&self) -> impl Future<Output = Result<Vec<Poll>, StoreError>> + Send;

    fn find_poll(&self, id: i32) -> impl Future<Output = Result<Option<Poll>, StoreError>> + Send;

    /// Inserts `poll` and returns it with its generated id.
    fn insert_poll(
        &self,
        poll: Poll,
        actor: &str,
    ) -> impl Future<Output = Result<Poll, StoreError>> + Send;

    fn update_poll(
        &self,
        poll: Poll,
        actor: &str,
    ) -> impl Future<Output = Result<Poll, StoreError>> + Send;

    /// Removes the poll along with its questions, answers and votes.
    fn delete_poll(&self, id: i32) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All questions of a poll with all of their answers, ordered by id.
    fn questions(
        &self,
        poll_id: i32,
    ) -> impl Future<Output = Result<Vec<Question>, StoreError>> + Send;

    fn find_question(
        &self,
        poll_id: i32,
        id: i32,
    ) -> impl Future<Output = Result<Option<Question>, StoreError>> + Send;

    /// Whether another question of the poll (other than `except`) has the same normalized content.
    fn question_content_exists(
        &self,
        poll_id: i32,
        content: &str,
        except: Option<i32>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Inserts the question and its answers. Fails with `Conflict` on duplicated content.
    fn insert_question(
        &self,
        question: Question,
        actor: &str,
    ) -> impl Future<Output = Result<Question, StoreError>> + Send;

    /// Saves the question and reconciles its answers: answers with an id are updated,
    /// answers with id 0 are inserted and answers missing from the list are removed,
    /// or deactivated when recorded votes reference them.
    fn update_question(
        &self,
        question: Question,
        actor: &str,
    ) -> impl Future<Output = Result<Question, StoreError>> + Send;

    fn has_voted(
        &self,
        poll_id: i32,
        user_id: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Inserts the vote and its selections. Fails with `Conflict` when the user
    /// already voted on the poll.
    fn insert_vote(&self, vote: Vote) -> impl Future<Output = Result<Vote, StoreError>> + Send;
}
