//! HTTP mapping of [`Error`].
//!
//! Field validation becomes `{"<field>": ["<message>"]}`, membership conflicts
//! become `{"errors": "..."}` and everything addressed at a resource uses
//! `{"detail": "..."}`. Infrastructure failures are logged and answered with a
//! generic 500 so internals never leak to clients.

use crate::errors::Error;
use axum::{
    Json,
    extract::{
        path::ErrorKind,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use tracing::error;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation { field, message } => {
                let mut fields = Map::new();
                fields.insert(field.clone(), json!([message]));
                (StatusCode::BAD_REQUEST, Value::Object(fields))
            }
            Self::AlreadyPresent { message } | Self::NotPresent { message } => {
                (StatusCode::BAD_REQUEST, json!({ "errors": message }))
            }
            Self::SelfSubscription => (StatusCode::BAD_REQUEST, json!({ "errors": self.to_string() })),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, json!({ "detail": self.to_string() })),
            Self::Forbidden { message } => (StatusCode::FORBIDDEN, json!({ "detail": message })),
            Self::Unauthorized { message } => {
                (StatusCode::UNAUTHORIZED, json!({ "detail": message }))
            }
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::ShortLinkExhausted { .. }
            | Self::PasswordHash { .. } => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "Internal server error." }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Malformed or incomplete JSON bodies are reported like any other field error.
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation("non_field_errors", rejection.body_text())
    }
}

/// An id segment that does not parse names no object, so it is a 404.
impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        let id = match rejection {
            PathRejection::FailedToDeserializePathParams(err) => match err.into_kind() {
                ErrorKind::ParseErrorAtKey { value, .. }
                | ErrorKind::ParseErrorAtIndex { value, .. }
                | ErrorKind::ParseError { value, .. } => value,
                other => other.to_string(),
            },
            other => other.body_text(),
        };
        Self::NotFound {
            resource: "Resource",
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: Error) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_and_body_shapes() {
        let (status, body) = render(Error::validation("cooking_time", "Too small.")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "cooking_time": ["Too small."] }));

        let (status, body) = render(Error::AlreadyPresent {
            message: "Recipe is already in favorites.".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"], "Recipe is already in favorites.");

        let (status, _) = render(Error::SelfSubscription).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = render(Error::not_found("Recipe", 7)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Recipe 7 not found");

        let (status, _) = render(Error::Forbidden {
            message: "no".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = render(Error::Unauthorized {
            message: "no".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_internal_errors_are_opaque() {
        let (status, body) = render(Error::ShortLinkExhausted { attempts: 16 }).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "detail": "Internal server error." }));
    }
}
