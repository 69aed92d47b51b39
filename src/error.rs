// src/error.rs
use crate::agent::AgentError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Errors a match operation can surface to the HTTP layer.
#[derive(Debug)]
pub enum MatchError {
    StudentNotFound(String),
    NoStudentSelected,
    RefinementInProgress,
    Agent(AgentError),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::StudentNotFound(id) => write!(f, "student {} not found", id),
            MatchError::NoStudentSelected => write!(f, "no student selected"),
            MatchError::RefinementInProgress => {
                write!(f, "a refinement is already in progress")
            }
            MatchError::Agent(err) => write!(f, "refinement failed: {}", err),
        }
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatchError::Agent(err) => Some(err),
            _ => None,
        }
    }
}

impl IntoResponse for MatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            MatchError::StudentNotFound(_) => StatusCode::NOT_FOUND,
            MatchError::NoStudentSelected | MatchError::RefinementInProgress => {
                StatusCode::CONFLICT
            }
            MatchError::Agent(AgentError::Disabled) => StatusCode::SERVICE_UNAVAILABLE,
            MatchError::Agent(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<AgentError> for MatchError {
    fn from(value: AgentError) -> Self {
        Self::Agent(value)
    }
}
