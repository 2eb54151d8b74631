use crate::audit::AuditFields;
use crate::auth::CurrentUser;
use crate::db::{Answer, Question, Store, StoreError, normalize_content};
use crate::error::{Error, PollErrors, QuestionErrors, ServiceError, ServiceResult, VoteErrors};
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path, State},
    http::{StatusCode, header::LOCATION},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub content: String,
    pub answers: Vec<AnswerRequest>,
}

/// An answer to create (no id) or to keep and rewrite (existing id).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub content: String,
}

/// Column width of both `questions.content` and `answers.content`.
const MAX_CONTENT_LEN: usize = 1000;

impl QuestionRequest {
    pub fn validate(&self) -> Result<(), Error> {
        let content = self.content.trim();
        if content.is_empty() || content.chars().count() > MAX_CONTENT_LEN {
            return Err(QuestionErrors::INVALID_CONTENT);
        }

        let mut seen = HashSet::new();
        for answer in &self.answers {
            let normalized = normalize_content(&answer.content);
            if normalized.is_empty()
                || answer.content.trim().chars().count() > MAX_CONTENT_LEN
                || !seen.insert(normalized)
            {
                return Err(QuestionErrors::INVALID_ANSWERS);
            }
        }
        if seen.len() < 2 {
            return Err(QuestionErrors::INVALID_ANSWERS);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: i32,
    pub content: String,
    pub answers: Vec<AnswerResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub id: i32,
    pub content: String,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self {
            id: answer.id,
            content: answer.content,
        }
    }
}

impl From<Question> for QuestionResponse {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            content: question.content,
            answers: question.answers.into_iter().map(AnswerResponse::from).collect(),
        }
    }
}

impl QuestionResponse {
    /// Projection shown to voters: only answers that can still be chosen.
    fn for_voting(question: Question) -> Self {
        Self {
            id: question.id,
            content: question.content,
            answers: question
                .answers
                .into_iter()
                .filter(|a| a.is_active)
                .map(AnswerResponse::from)
                .collect(),
        }
    }
}

fn rejected_write(err: StoreError) -> ServiceError {
    match err {
        StoreError::Conflict => QuestionErrors::DUPLICATED_QUESTION_CONTENT.into(),
        StoreError::NotFound => QuestionErrors::NOT_FOUND.into(),
        other => other.into(),
    }
}

pub struct QuestionService<S> {
    store: Arc<S>,
}

impl<S> Clone for QuestionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> QuestionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every question of the poll, inactive ones included.
    pub async fn get_all(&self, poll_id: i32) -> ServiceResult<Vec<QuestionResponse>> {
        self.ensure_poll(poll_id).await?;
        let questions = self.store.questions(poll_id).await?;
        Ok(questions.into_iter().map(QuestionResponse::from).collect())
    }

    pub async fn get(&self, poll_id: i32, id: i32) -> ServiceResult<QuestionResponse> {
        Ok(self.load(poll_id, id).await?.into())
    }

    /// Active questions the user may still vote on. Gates run in order: the poll
    /// exists, it is published and open today, and the user has not voted yet.
    pub async fn get_available(
        &self,
        poll_id: i32,
        user_id: &str,
    ) -> ServiceResult<Vec<QuestionResponse>> {
        let today = Utc::now().date_naive();
        let poll = self
            .store
            .find_poll(poll_id)
            .await?
            .ok_or(PollErrors::NOT_FOUND)?;
        if !poll.is_open_on(today) {
            return Err(PollErrors::NOT_FOUND.into());
        }

        if self.store.has_voted(poll_id, user_id).await? {
            return Err(VoteErrors::DUPLICATED_VOTE.into());
        }

        let questions = self.store.questions(poll_id).await?;
        Ok(questions
            .into_iter()
            .filter(|q| q.is_active)
            .map(QuestionResponse::for_voting)
            .collect())
    }

    pub async fn add(
        &self,
        poll_id: i32,
        request: QuestionRequest,
        actor: &str,
    ) -> ServiceResult<QuestionResponse> {
        self.ensure_poll(poll_id).await?;
        request.validate()?;

        let content = request.content.trim().to_string();
        if self
            .store
            .question_content_exists(poll_id, &content, None)
            .await?
        {
            return Err(QuestionErrors::DUPLICATED_QUESTION_CONTENT.into());
        }

        let question = Question {
            id: 0,
            poll_id,
            content,
            is_active: true,
            audit: AuditFields::default(),
            answers: request
                .answers
                .into_iter()
                .map(|answer| Answer {
                    id: 0,
                    question_id: 0,
                    content: answer.content.trim().to_string(),
                    is_active: true,
                })
                .collect(),
        };

        let question = self
            .store
            .insert_question(question, actor)
            .await
            .map_err(rejected_write)?;
        info!(poll_id, question_id = question.id, "question created");
        Ok(question.into())
    }

    pub async fn update(
        &self,
        poll_id: i32,
        id: i32,
        request: QuestionRequest,
        actor: &str,
    ) -> ServiceResult<QuestionResponse> {
        let mut question = self.load(poll_id, id).await?;
        request.validate()?;

        let content = request.content.trim().to_string();
        if self
            .store
            .question_content_exists(poll_id, &content, Some(id))
            .await?
        {
            return Err(QuestionErrors::DUPLICATED_QUESTION_CONTENT.into());
        }

        let mut answers = Vec::with_capacity(request.answers.len());
        let mut reused = HashSet::new();
        for answer in request.answers {
            let answer_id = match answer.id {
                Some(answer_id) if !question.answers.iter().any(|a| a.id == answer_id) => {
                    return Err(QuestionErrors::UNKNOWN_ANSWER.into());
                }
                Some(answer_id) if !reused.insert(answer_id) => {
                    return Err(QuestionErrors::INVALID_ANSWERS.into());
                }
                Some(answer_id) => answer_id,
                None => 0,
            };
            answers.push(Answer {
                id: answer_id,
                question_id: id,
                content: answer.content.trim().to_string(),
                is_active: true,
            });
        }

        question.content = content;
        question.answers = answers;

        let question = self
            .store
            .update_question(question, actor)
            .await
            .map_err(rejected_write)?;
        Ok(question.into())
    }

    pub async fn toggle_status(&self, poll_id: i32, id: i32, actor: &str) -> ServiceResult {
        let mut question = self.load(poll_id, id).await?;
        question.is_active = !question.is_active;
        self.store
            .update_question(question, actor)
            .await
            .map_err(rejected_write)?;
        Ok(())
    }

    async fn ensure_poll(&self, poll_id: i32) -> ServiceResult {
        self.store
            .find_poll(poll_id)
            .await?
            .ok_or(PollErrors::NOT_FOUND)?;
        Ok(())
    }

    async fn load(&self, poll_id: i32, id: i32) -> ServiceResult<Question> {
        Ok(self
            .store
            .find_question(poll_id, id)
            .await?
            .ok_or(QuestionErrors::NOT_FOUND)?)
    }
}

pub async fn get_all<S: Store>(
    State(state): State<AppState<S>>,
    Path(poll_id): Path<i32>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(state.questions.get_all(poll_id).await?))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Path((poll_id, id)): Path<(i32, i32)>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(state.questions.get(poll_id, id).await?))
}

pub async fn add<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<CurrentUser>,
    Path(poll_id): Path<i32>,
    Json(payload): Json<QuestionRequest>,
) -> ServiceResult<impl IntoResponse> {
    let question = state.questions.add(poll_id, payload, &user.0).await?;
    let location = format!("/api/polls/{}/questions/{}", poll_id, question.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(question)))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<CurrentUser>,
    Path((poll_id, id)): Path<(i32, i32)>,
    Json(payload): Json<QuestionRequest>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(
        state.questions.update(poll_id, id, payload, &user.0).await?,
    ))
}

pub async fn toggle_status<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<CurrentUser>,
    Path((poll_id, id)): Path<(i32, i32)>,
) -> ServiceResult<impl IntoResponse> {
    state.questions.toggle_status(poll_id, id, &user.0).await?;
    Ok(StatusCode::NO_CONTENT)
}
