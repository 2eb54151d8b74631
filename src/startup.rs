use crate::auth::{self, JwtVerifier};
use crate::db::Store;
use crate::polls::{self, PollService};
use crate::questions::{self, QuestionService};
use crate::votes::{self, VoteService};
use axum::{
    Router,
    http::{
        Method, StatusCode,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppState<S> {
    pub polls: PollService<S>,
    pub questions: QuestionService<S>,
    pub votes: VoteService<S>,
    pub verifier: Arc<JwtVerifier>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            polls: self.polls.clone(),
            questions: self.questions.clone(),
            votes: self.votes.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, verifier: JwtVerifier) -> Self {
        let store = Arc::new(store);
        Self {
            polls: PollService::new(store.clone()),
            questions: QuestionService::new(store.clone()),
            votes: VoteService::new(store),
            verifier: Arc::new(verifier),
        }
    }
}

/// Every `/api/polls` route requires a bearer token.
pub fn router<S: Store>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route("/api/polls", get(polls::get_all::<S>).post(polls::add::<S>))
        .route("/api/polls/current", get(polls::get_current::<S>))
        .route(
            "/api/polls/:poll_id",
            get(polls::get::<S>)
                .put(polls::update::<S>)
                .delete(polls::delete::<S>),
        )
        .route(
            "/api/polls/:poll_id/togglePublish",
            put(polls::toggle_publish::<S>),
        )
        .route(
            "/api/polls/:poll_id/questions",
            get(questions::get_all::<S>).post(questions::add::<S>),
        )
        .route(
            "/api/polls/:poll_id/questions/:id",
            get(questions::get::<S>).put(questions::update::<S>),
        )
        .route(
            "/api/polls/:poll_id/questions/:id/toggleStatus",
            put(questions::toggle_status::<S>),
        )
        .route(
            "/api/polls/:poll_id/vote",
            get(votes::start::<S>).post(votes::vote::<S>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.verifier.clone(),
            auth::require_user,
        ))
        .with_state(state);

    api.fallback(handler_404)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT, AUTHORIZATION]),
        )
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
