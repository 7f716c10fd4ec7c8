//! HTTP error mapping.

use crate::bus::BusError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use derive_more::Display;
use live_tictactoe::GameError;
use tracing::warn;

/// Errors a request handler can return.
#[derive(Debug, Display)]
pub enum ApiError {
    /// Rule or lookup failure.
    #[display("{_0}")]
    Game(GameError),
    /// An event hub is gone.
    #[display("{_0}")]
    Bus(BusError),
    /// The client could not be attached to a stream.
    #[display("Could not set up client session: {_0}")]
    StreamSetupFailure(String),
    /// The request body could not be decoded.
    #[display("Bad request: {_0}")]
    BadRequest(String),
    /// A fragment failed to render.
    #[display("Could not render page")]
    Render,
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Game(e) => Some(e),
            ApiError::Bus(e) => Some(e),
            ApiError::StreamSetupFailure(_) | ApiError::BadRequest(_) | ApiError::Render => None,
        }
    }
}

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        ApiError::Game(e)
    }
}

impl From<BusError> for ApiError {
    fn from(e: BusError) -> Self {
        ApiError::Bus(e)
    }
}

impl From<std::fmt::Error> for ApiError {
    fn from(_: std::fmt::Error) -> Self {
        ApiError::Render
    }
}

impl ApiError {
    /// Response status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Game(GameError::GameNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Game(GameError::ForbiddenMover) => StatusCode::FORBIDDEN,
            ApiError::Game(GameError::InconsistentHistory(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Game(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Bus(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::StreamSetupFailure(_) | ApiError::Render => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "Request failed");
        (status, self.to_string()).into_response()
    }
}
