use crate::auth::CurrentUser;
use crate::db::{Question, Store, StoreError, Vote, VoteAnswer};
use crate::error::{Error, PollErrors, ServiceError, ServiceResult, VoteErrors};
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub answers: Vec<VoteAnswerRequest>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteAnswerRequest {
    pub question_id: i32,
    pub answer_id: i32,
}

pub struct VoteService<S> {
    store: Arc<S>,
}

impl<S> Clone for VoteService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

/// Checks that `selections` answer each active question exactly once with one of
/// its active answers.
fn check_selections(
    active: &[Question],
    selections: &[VoteAnswerRequest],
) -> Result<(), Error> {
    let mut answered = HashSet::new();
    for selection in selections {
        let question = active
            .iter()
            .find(|q| q.id == selection.question_id)
            .ok_or(VoteErrors::INVALID_QUESTIONS)?;

        if !question
            .answers
            .iter()
            .any(|a| a.id == selection.answer_id && a.is_active)
        {
            return Err(VoteErrors::INVALID_ANSWERS);
        }

        if !answered.insert(selection.question_id) {
            return Err(VoteErrors::INVALID_QUESTIONS);
        }
    }

    if selections.is_empty() || answered.len() != active.len() {
        return Err(VoteErrors::INVALID_QUESTIONS);
    }
    Ok(())
}

impl<S: Store> VoteService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn add(&self, poll_id: i32, user_id: &str, request: VoteRequest) -> ServiceResult {
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

        let active: Vec<Question> = self
            .store
            .questions(poll_id)
            .await?
            .into_iter()
            .filter(|q| q.is_active)
            .collect();
        check_selections(&active, &request.answers)?;

        let vote = Vote {
            id: 0,
            poll_id,
            user_id: user_id.to_string(),
            submitted_on: Utc::now(),
            answers: request
                .answers
                .iter()
                .map(|s| VoteAnswer {
                    question_id: s.question_id,
                    answer_id: s.answer_id,
                })
                .collect(),
        };

        match self.store.insert_vote(vote).await {
            Ok(vote) => {
                info!(poll_id, vote_id = vote.id, "vote recorded");
                Ok(())
            }
            Err(StoreError::Conflict) => {
                warn!(poll_id, user_id, "concurrent duplicate vote rejected");
                Err(VoteErrors::DUPLICATED_VOTE.into())
            }
            Err(err) => Err(ServiceError::from(err)),
        }
    }
}

pub async fn start<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<CurrentUser>,
    Path(poll_id): Path<i32>,
) -> ServiceResult<impl IntoResponse> {
    Ok(Json(state.questions.get_available(poll_id, &user.0).await?))
}

pub async fn vote<S: Store>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<CurrentUser>,
    Path(poll_id): Path<i32>,
    Json(payload): Json<VoteRequest>,
) -> ServiceResult<impl IntoResponse> {
    state.votes.add(poll_id, &user.0, payload).await?;
    Ok(StatusCode::CREATED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::polls::{PollService, tests::request as poll_request};
    use crate::questions::{QuestionResponse, QuestionService, tests::question};
    use chrono::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        polls: PollService<MemoryStore>,
        questions: QuestionService<MemoryStore>,
        votes: VoteService<MemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::default());
            Self {
                polls: PollService::new(store.clone()),
                questions: QuestionService::new(store.clone()),
                votes: VoteService::new(store.clone()),
                store,
            }
        }

        /// Published poll with an active Q1 and an inactive Q2.
        async fn scenario(&self) -> (i32, QuestionResponse, QuestionResponse) {
            let poll = self.polls.add(poll_request("Survey"), "admin").await.unwrap();
            self.polls.toggle_publish_status(poll.id, "admin").await.unwrap();

            let q1 = self
                .questions
                .add(poll.id, question("Q1", &["Yes", "No"]), "admin")
                .await
                .unwrap();
            let q2 = self
                .questions
                .add(poll.id, question("Q2", &["Left", "Right"]), "admin")
                .await
                .unwrap();
            self.questions.toggle_status(poll.id, q2.id, "admin").await.unwrap();
            (poll.id, q1, q2)
        }
    }

    fn pick(question: &QuestionResponse, index: usize) -> VoteAnswerRequest {
        VoteAnswerRequest {
            question_id: question.id,
            answer_id: question.answers[index].id,
        }
    }

    #[tokio::test]
    async fn vote_succeeds_once_per_user_and_poll() {
        let fx = Fixture::new();
        let (poll_id, q1, _) = fx.scenario().await;
        let request = VoteRequest { answers: vec![pick(&q1, 0)] };

        fx.votes.add(poll_id, "u1", request.clone()).await.expect("first vote");

        let err = fx.votes.add(poll_id, "u1", request.clone()).await.unwrap_err();
        assert_eq!(err.rejection(), Some(VoteErrors::DUPLICATED_VOTE));

        fx.votes.add(poll_id, "u2", request).await.expect("another user may vote");

        let votes = fx.store.votes();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].answers, vec![VoteAnswer { question_id: q1.id, answer_id: q1.answers[0].id }]);

        let err = fx.questions.get_available(poll_id, "u1").await.unwrap_err();
        assert_eq!(err.rejection(), Some(VoteErrors::DUPLICATED_VOTE));
    }

    #[tokio::test]
    async fn vote_requires_a_published_poll_within_its_window() {
        let fx = Fixture::new();
        let request = VoteRequest { answers: Vec::new() };

        let err = fx.votes.add(7, "u1", request.clone()).await.unwrap_err();
        assert_eq!(err.rejection(), Some(PollErrors::NOT_FOUND));

        let draft = fx.polls.add(poll_request("Draft"), "admin").await.unwrap();
        let err = fx.votes.add(draft.id, "u1", request.clone()).await.unwrap_err();
        assert_eq!(err.rejection(), Some(PollErrors::NOT_FOUND));

        let today = Utc::now().date_naive();
        for (starts_in, ends_in) in [(-10, -2), (2, 10)] {
            let mut payload = poll_request("Off window");
            payload.starts_at = today + Duration::days(starts_in);
            payload.ends_at = today + Duration::days(ends_in);
            let poll = fx.polls.add(payload, "admin").await.unwrap();
            fx.polls.toggle_publish_status(poll.id, "admin").await.unwrap();
            assert!(fx.polls.get(poll.id).await.unwrap().is_published);

            let err = fx.votes.add(poll.id, "u1", request.clone()).await.unwrap_err();
            assert_eq!(err.rejection(), Some(PollErrors::NOT_FOUND), "window {starts_in}..{ends_in}");
        }
        assert!(fx.store.votes().is_empty());
    }

    #[tokio::test]
    async fn selections_must_cover_exactly_the_active_questions() {
        let fx = Fixture::new();
        let (poll_id, q1, q2) = fx.scenario().await;
        let q3 = fx
            .questions
            .add(poll_id, question("Q3", &["Up", "Down"]), "admin")
            .await
            .unwrap();

        let cases = vec![
            (vec![], VoteErrors::INVALID_QUESTIONS),
            (vec![pick(&q1, 0)], VoteErrors::INVALID_QUESTIONS),
            (vec![pick(&q1, 0), pick(&q3, 0), pick(&q2, 0)], VoteErrors::INVALID_QUESTIONS),
            (vec![pick(&q1, 0), pick(&q1, 1), pick(&q3, 0)], VoteErrors::INVALID_QUESTIONS),
            (
                vec![
                    pick(&q1, 0),
                    VoteAnswerRequest { question_id: q3.id, answer_id: q1.answers[1].id },
                ],
                VoteErrors::INVALID_ANSWERS,
            ),
            (
                vec![pick(&q1, 0), VoteAnswerRequest { question_id: 9999, answer_id: 1 }],
                VoteErrors::INVALID_QUESTIONS,
            ),
        ];

        for (answers, expected) in cases {
            let err = fx
                .votes
                .add(poll_id, "u1", VoteRequest { answers: answers.clone() })
                .await
                .expect_err("invalid selection set");
            assert_eq!(err.rejection(), Some(expected), "selection {answers:?}");
        }
        assert!(fx.store.votes().is_empty());

        fx.votes
            .add(poll_id, "u1", VoteRequest { answers: vec![pick(&q3, 1), pick(&q1, 0)] })
            .await
            .expect("complete selection set");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_votes_admit_exactly_one() {
        let fx = Fixture::new();
        let (poll_id, q1, _) = fx.scenario().await;
        let votes = fx.votes.clone();

        let attempts = (0..8).map(|_| {
            let votes = votes.clone();
            let request = VoteRequest { answers: vec![pick(&q1, 1)] };
            tokio::spawn(async move { votes.add(poll_id, "u1", request).await })
        });

        let outcomes: Vec<_> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.expect("task completes"))
            .collect();

        let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(accepted, 1);
        for outcome in outcomes.into_iter().filter_map(Result::err) {
            assert_eq!(outcome.rejection(), Some(VoteErrors::DUPLICATED_VOTE));
        }
        assert_eq!(fx.store.votes().len(), 1);
    }
}
