use crate::audit::{self, Change};
use crate::db::models::{Poll, Question, Vote, normalize_content};
use crate::db::store::{Store, StoreError};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-process [`Store`] enforcing the same uniqueness rules as the database schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    polls: BTreeMap<i32, Poll>,
    questions: BTreeMap<i32, Question>,
    votes: Vec<Vote>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn content_taken(&self, poll_id: i32, content: &str, except: Option<i32>) -> bool {
        let wanted = normalize_content(content);
        self.questions.values().any(|q| {
            q.poll_id == poll_id && Some(q.id) != except && normalize_content(&q.content) == wanted
        })
    }

    fn answer_has_votes(&self, answer_id: i32) -> bool {
        self.votes
            .iter()
            .flat_map(|v| v.answers.iter())
            .any(|s| s.answer_id == answer_id)
    }
}

impl MemoryStore {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store mutex poisoned")
    }

    pub fn votes(&self) -> Vec<Vote> {
        self.tables().votes.clone()
    }

    pub fn question_count(&self, poll_id: i32) -> usize {
        self.tables()
            .questions
            .values()
            .filter(|q| q.poll_id == poll_id)
            .count()
    }
}

impl Store for MemoryStore {
    async fn polls(&self) -> Result<Vec<Poll>, StoreError> {
        Ok(self.tables().polls.values().cloned().collect())
    }

    async fn find_poll(&self, id: i32) -> Result<Option<Poll>, StoreError> {
        Ok(self.tables().polls.get(&id).cloned())
    }

    async fn insert_poll(&self, poll: Poll, actor: &str) -> Result<Poll, StoreError> {
        let mut poll = audit::stamp(poll, Change::Added, actor, Utc::now());
        let mut tables = self.tables();
        poll.id = tables.next_id();
        tables.polls.insert(poll.id, poll.clone());
        Ok(poll)
    }

    async fn update_poll(&self, poll: Poll, actor: &str) -> Result<Poll, StoreError> {
        let poll = audit::stamp(poll, Change::Modified, actor, Utc::now());
        let mut tables = self.tables();
        let stored = tables.polls.get_mut(&poll.id).ok_or(StoreError::NotFound)?;
        *stored = poll.clone();
        Ok(poll)
    }

    async fn delete_poll(&self, id: i32) -> Result<(), StoreError> {
        let mut tables = self.tables();
        tables.votes.retain(|v| v.poll_id != id);
        tables.questions.retain(|_, q| q.poll_id != id);
        tables.polls.remove(&id);
        Ok(())
    }

    async fn questions(&self, poll_id: i32) -> Result<Vec<Question>, StoreError> {
        Ok(self
            .tables()
            .questions
            .values()
            .filter(|q| q.poll_id == poll_id)
            .cloned()
            .collect())
    }

    async fn find_question(&self, poll_id: i32, id: i32) -> Result<Option<Question>, StoreError> {
        Ok(self
            .tables()
            .questions
            .get(&id)
            .filter(|q| q.poll_id == poll_id)
            .cloned())
    }

    async fn question_content_exists(
        &self,
        poll_id: i32,
        content: &str,
        except: Option<i32>,
    ) -> Result<bool, StoreError> {
        Ok(self.tables().content_taken(poll_id, content, except))
    }

    async fn insert_question(&self, question: Question, actor: &str) -> Result<Question, StoreError> {
        let mut question = audit::stamp(question, Change::Added, actor, Utc::now());
        let mut tables = self.tables();
        if tables.content_taken(question.poll_id, &question.content, None) {
            return Err(StoreError::Conflict);
        }

        question.id = tables.next_id();
        for answer in question.answers.iter_mut() {
            answer.id = tables.next_id();
            answer.question_id = question.id;
        }
        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn update_question(&self, question: Question, actor: &str) -> Result<Question, StoreError> {
        let mut question = audit::stamp(question, Change::Modified, actor, Utc::now());
        let mut tables = self.tables();
        if !tables.questions.contains_key(&question.id) {
            return Err(StoreError::NotFound);
        }
        if tables.content_taken(question.poll_id, &question.content, Some(question.id)) {
            return Err(StoreError::Conflict);
        }

        for answer in question.answers.iter_mut() {
            answer.question_id = question.id;
            if answer.id == 0 {
                answer.id = tables.next_id();
            }
        }

        let kept: Vec<i32> = question.answers.iter().map(|a| a.id).collect();
        let previous = tables
            .questions
            .get(&question.id)
            .map(|q| q.answers.clone())
            .unwrap_or_default();
        for mut dropped in previous.into_iter().filter(|old| !kept.contains(&old.id)) {
            if tables.answer_has_votes(dropped.id) {
                dropped.is_active = false;
                question.answers.push(dropped);
            }
        }
        question.answers.sort_by_key(|a| a.id);

        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn has_voted(&self, poll_id: i32, user_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .tables()
            .votes
            .iter()
            .any(|v| v.poll_id == poll_id && v.user_id == user_id))
    }

    async fn insert_vote(&self, mut vote: Vote) -> Result<Vote, StoreError> {
        let mut tables = self.tables();
        if tables
            .votes
            .iter()
            .any(|v| v.poll_id == vote.poll_id && v.user_id == vote.user_id)
        {
            return Err(StoreError::Conflict);
        }

        vote.id = tables.next_id();
        tables.votes.push(vote.clone());
        Ok(vote)
    }
}
