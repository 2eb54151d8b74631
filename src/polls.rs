use crate::audit::AuditFields;
use crate::auth::CurrentUser;
use crate::db::{Poll, Store, StoreError};
use crate::error::{Error, PollErrors, ServiceError, ServiceResult};
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path, State},
    http::{StatusCode, header::LOCATION},
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starts_at: NaiveDate,
    pub ends_at: NaiveDate,
}

impl PollRequest {
    pub fn validate(&self) -> Result<(), Error> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > 100 {
            return Err(PollErrors::INVALID_TITLE);
        }
        if self.description.chars().count() > 1500 {
            return Err(PollErrors::INVALID_DESCRIPTION);
        }
        if self.ends_at < self.starts_at {
            return Err(PollErrors::INVALID_SCHEDULE);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: i32,
    pub title: String,
    pub notes: String,
    pub is_published: bool,
    pub starts_at: NaiveDate,
    pub ends_at: NaiveDate,
}

impl From<Poll> for PollResponse {
    fn from(poll: Poll) -> Self {
        Self {
            id: poll.id,
            title: poll.title,
            notes: poll.description,
            is_published: poll.is_published,
            starts_at: poll.starts_at,
            ends_at: poll.ends_at,
        }
    }
}

fn vanished_poll(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound => PollErrors::NOT_FOUND.into(),
        other => other.into(),
    }
}

pub struct PollService<S> {
    store: Arc<S>,
}

impl<S> Clone for PollService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> PollService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<PollResponse>> {
        let polls = self.store.polls().await?;
        Ok(polls.into_iter().map(PollResponse::from).collect())
    }

    /// Published polls whose window contains today.
    pub async fn get_current(&self) -> ServiceResult<Vec<PollResponse>> {
        let today = Utc::now().date_naive();
        let polls = self.store.polls().await?;
        Ok(polls
            .into_iter()
            .filter(|poll| poll.is_open_on(today))
            .map(PollResponse::from)
            .collect())
    }

    pub async fn get(&self, id: i32) -> ServiceResult<PollResponse> {
        Ok(self.load(id).await?.into())
    }

    pub async fn add(&self, request: PollRequest, actor: &str) -> ServiceResult<PollResponse> {
        request.validate()?;

        let poll = Poll {
            id: 0,
            title: request.title.trim().to_string(),
            description: request.description,
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            is_published: false,
            audit: AuditFields::default(),
        };

        let poll = self.store.insert_poll(poll, actor).await?;
        info!(poll_id = poll.id, "poll created");
        Ok(poll.into())
    }

    pub async fn update(&self, id: i32, request: PollRequest, actor: &str) -> ServiceResult {
        request.validate()?;

        let mut poll = self.load(id).await?;
        poll.title = request.title.trim().to_string();
        poll.description = request.description;
        poll.starts_at = request.starts_at;
        poll.ends_at = request.ends_at;

        self.store.update_poll(poll, actor).await.map_err(vanished_poll)?;
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> ServiceResult {
        self.load(id).await?;
        self.store.delete_poll(id).await?;
        info!(poll_id = id, "poll deleted");
        Ok(())
    }

    pub async fn toggle_publish_status(&self, id: i32, actor: &str) -> ServiceResult {
        let mut poll = self.load(id).await?;
        poll.is_published = !poll.is_published;
        self.store.update_poll(poll, actor).await.map_err(vanished_poll)?;
        Ok(())
    }

    async fn load(&self, id: i32) -> ServiceResult<Poll> {
        Ok(self
            .store
            .find_poll(id)
            .await?
            .ok_or(PollErrors::NOT_FOUND)?)
    }
}

pub async fn get_all<S: Store>(
    State(state): State<AppState<S>>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(state.polls.get_all().await?))
}

pub async fn get_current<S: Store>(
    State(state): State<AppState<S>>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(state.polls.get_current().await?))
}

pub async fn get<S: Store>(
    State(state): State<AppState<S>>,
    Path(poll_id): Path<i32>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(state.polls.get(poll_id).await?))
}

pub async fn add<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<PollRequest>,
) -> ServiceResult<impl IntoResponse> {
    let poll = state.polls.add(payload, &user.0).await?;
    let location = format!("/api/polls/{}", poll.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(poll)))
}

pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<CurrentUser>,
    Path(poll_id): Path<i32>,
    Json(payload): Json<PollRequest>,
) -> ServiceResult<impl IntoResponse> {
    state.polls.update(poll_id, payload, &user.0).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Path(poll_id): Path<i32>,
) -> ServiceResult<impl IntoResponse> {
    state.polls.delete(poll_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_publish<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<CurrentUser>,
    Path(poll_id): Path<i32>,
) -> ServiceResult<impl IntoResponse> {
    state.polls.toggle_publish_status(poll_id, &user.0).await?;
    Ok(StatusCode::NO_CONTENT)
}
