use crate::db::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;
use tracing::error;

/// An expected business failure. Two errors are the same failure when their codes match.
#[derive(Debug, Clone, Copy)]
pub struct Error {
    pub code: &'static str,
    pub message: &'static str,
    pub status: StatusCode,
}

impl Error {
    pub const fn new(code: &'static str, message: &'static str, status: StatusCode) -> Self {
        Self {
            code,
            message,
            status,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

pub struct PollErrors;

impl PollErrors {
    pub const NOT_FOUND: Error = Error::new(
        "Poll.NotFound",
        "No poll was found with the given ID",
        StatusCode::NOT_FOUND,
    );
    pub const INVALID_TITLE: Error = Error::new(
        "Poll.InvalidTitle",
        "Title is required and can not exceed 100 characters",
        StatusCode::BAD_REQUEST,
    );
    pub const INVALID_DESCRIPTION: Error = Error::new(
        "Poll.InvalidDescription",
        "Description can not exceed 1500 characters",
        StatusCode::BAD_REQUEST,
    );
    pub const INVALID_SCHEDULE: Error = Error::new(
        "Poll.InvalidSchedule",
        "End date must be greater than or equal to the start date",
        StatusCode::BAD_REQUEST,
    );
}

pub struct QuestionErrors;

impl QuestionErrors {
    pub const NOT_FOUND: Error = Error::new(
        "Question.NotFound",
        "No question was found with the given ID",
        StatusCode::NOT_FOUND,
    );
    pub const DUPLICATED_QUESTION_CONTENT: Error = Error::new(
        "Question.DuplicatedQuestionContent",
        "Another question with the same content already exists in this poll",
        StatusCode::CONFLICT,
    );
    pub const INVALID_CONTENT: Error = Error::new(
        "Question.InvalidContent",
        "Content is required and can not exceed 1000 characters",
        StatusCode::BAD_REQUEST,
    );
    pub const INVALID_ANSWERS: Error = Error::new(
        "Question.InvalidAnswers",
        "A question needs at least two distinct, non-empty answers",
        StatusCode::BAD_REQUEST,
    );
    pub const UNKNOWN_ANSWER: Error = Error::new(
        "Question.UnknownAnswer",
        "An answer ID does not belong to this question",
        StatusCode::BAD_REQUEST,
    );
}

pub struct VoteErrors;

impl VoteErrors {
    pub const DUPLICATED_VOTE: Error = Error::new(
        "Vote.DuplicatedVote",
        "This user already voted before for this poll",
        StatusCode::CONFLICT,
    );
    pub const INVALID_QUESTIONS: Error = Error::new(
        "Vote.InvalidQuestions",
        "The vote must answer every active question of the poll exactly once",
        StatusCode::BAD_REQUEST,
    );
    pub const INVALID_ANSWERS: Error = Error::new(
        "Vote.InvalidAnswers",
        "A selected answer does not belong to its question",
        StatusCode::BAD_REQUEST,
    );
}

pub struct UserErrors;

impl UserErrors {
    pub const INVALID_JWT_TOKEN: Error = Error::new(
        "User.InvalidJwtToken",
        "Invalid Jwt token",
        StatusCode::UNAUTHORIZED,
    );
}

/// Failure of a service operation: either a business rejection or a storage fault.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Rejected(Error),
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
impl ServiceError {
    /// The business error carried by this failure, if any.
    pub fn rejection(&self) -> Option<Error> {
        match self {
            ServiceError::Rejected(error) => Some(*error),
            ServiceError::Store(_) => None,
        }
    }
}

impl From<Error> for ServiceError {
    fn from(error: Error) -> Self {
        ServiceError::Rejected(error)
    }
}

pub type ServiceResult<T = ()> = Result<T, ServiceError>;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Rejected(error) => error.into_response(),
            ServiceError::Store(err) => {
                error!("unexpected storage failure: {}", err);
                let body = Json(json!({
                    "code": "Server.Unexpected",
                    "message": "An unexpected error occurred",
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
