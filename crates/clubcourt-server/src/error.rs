use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use clubcourt_core::protocol::ErrorBody;
use clubcourt_core::Error as CoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("not found")]
    NotFound,

    #[error("a player cannot be paired with themselves")]
    SelfPairing,

    #[error("a player_id is required to report a match result")]
    MissingPlayer,

    #[error("too many live scoring sessions")]
    SessionsFull,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("session store error: {0}")]
    SessionStore(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(err) => match err {
                CoreError::InvalidSide(_)
                | CoreError::EmptyProposal
                | CoreError::TimeNotOffered
                | CoreError::MalformedScore(_) => StatusCode::BAD_REQUEST,
                CoreError::NotYourTurn | CoreError::UnknownPlayer(_) => StatusCode::FORBIDDEN,
                CoreError::InvalidTransition { .. } | CoreError::StaleRevision { .. } => {
                    StatusCode::CONFLICT
                }
                CoreError::NoWinner => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::UnknownStatus(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::SelfPairing | ApiError::MissingPlayer => StatusCode::BAD_REQUEST,
            ApiError::SessionsFull => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Storage(_) | ApiError::SessionStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubcourt_core::{MatchAction, MatchStatus};

    #[test]
    fn lifecycle_errors_map_to_statuses() {
        let conflict = ApiError::from(CoreError::InvalidTransition {
            from: MatchStatus::Confirmed,
            action: MatchAction::Confirm,
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(conflict.to_string(), "cannot confirm a match that is CONFIRMED");

        assert_eq!(
            ApiError::from(CoreError::NotYourTurn).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(CoreError::NoWinner).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(CoreError::InvalidSide("Q".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
