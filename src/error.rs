use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Failure talking to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API returned an empty response.")]
    Empty,
    #[error("Other: {0}")]
    Other(String),
}

/// Stable, serializable tag for a [`DemoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Service,
    MalformedResponse,
    MalformedMockData,
    Compilation,
    ComponentNotFound,
    AmbiguousComponent,
    Render,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DemoError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Malformed mock data: {0}")]
    MalformedMockData(String),
    #[error("{0}")]
    Compilation(String),
    #[error("Could not find a valid React Component in the generated code.")]
    ComponentNotFound,
    #[error("Several components could be mounted: {}", .0.join(", "))]
    AmbiguousComponent(Vec<String>),
    #[error("{0}")]
    Render(String),
}

impl DemoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DemoError::Service(_) => ErrorKind::Service,
            DemoError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            DemoError::MalformedMockData(_) => ErrorKind::MalformedMockData,
            DemoError::Compilation(_) => ErrorKind::Compilation,
            DemoError::ComponentNotFound => ErrorKind::ComponentNotFound,
            DemoError::AmbiguousComponent(_) => ErrorKind::AmbiguousComponent,
            DemoError::Render(_) => ErrorKind::Render,
        }
    }
}

/// Rejected session operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("A generation request is already in flight")]
    Busy,
    #[error("Session {0} not found")]
    NotFound(Uuid),
    #[error("Session was closed")]
    Gone,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowError {
    fn status(&self) -> StatusCode {
        match self {
            FlowError::InvalidTransition { .. } | FlowError::Busy => StatusCode::CONFLICT,
            FlowError::NotFound(_) => StatusCode::NOT_FOUND,
            FlowError::Gone => StatusCode::GONE,
            FlowError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            FlowError::InvalidTransition { .. } => "invalid_transition",
            FlowError::Busy => "busy",
            FlowError::NotFound(_) => "not_found",
            FlowError::Gone => "gone",
            FlowError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.code(), "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_service_reply_message() {
        let err = DemoError::from(ServiceError::Empty);
        assert_eq!(err.to_string(), "API returned an empty response.");
        assert_eq!(err.kind(), ErrorKind::Service);
    }

    #[test]
    fn flow_errors_map_to_status_codes() {
        assert_eq!(FlowError::Busy.into_response().status(), StatusCode::CONFLICT);
        assert_eq!(FlowError::Gone.into_response().status(), StatusCode::GONE);
        assert_eq!(
            FlowError::Internal("task panicked".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            FlowError::NotFound(Uuid::nil()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        let invalid = FlowError::InvalidTransition {
            action: "navigate forward",
            state: "editing",
        };
        assert_eq!(invalid.to_string(), "Cannot navigate forward while editing");
        assert_eq!(invalid.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn ambiguity_lists_candidates() {
        let err = DemoError::AmbiguousComponent(vec!["App".into(), "Table".into()]);
        assert_eq!(err.to_string(), "Several components could be mounted: App, Table");
        assert_eq!(err.kind(), ErrorKind::AmbiguousComponent);
    }
}
