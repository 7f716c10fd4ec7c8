//! Client identity cookie.
//!
//! Every request passes through [`client_id_layer`]. A request without the
//! cookie gets a freshly generated id, and the response sets the cookie so
//! the browser keeps the same identity across tabs and reconnects.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use live_tictactoe::ParticipantId;
use tracing::{debug, warn};
use uuid::Uuid;

/// Id of the client making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub ParticipantId);

/// Generates a short random id: the last two groups of a v4 UUID.
pub fn new_client_id() -> ParticipantId {
    let uuid = Uuid::new_v4().to_string();
    let mut groups = uuid.rsplit('-');
    let last = groups.next().unwrap_or_default();
    let second = groups.next().unwrap_or_default();
    ParticipantId::new(format!("{second}-{last}"))
}

/// Reads the cookie `name` from request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<ParticipantId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(ParticipantId::from)
}

/// Attaches a [`ClientId`] to every request, issuing one if needed.
pub async fn client_id_layer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let cookie_name = state.config().cookie_name();
    let (id, issued) = match cookie_value(request.headers(), cookie_name) {
        Some(id) => (id, false),
        None => (new_client_id(), true),
    };
    request.extensions_mut().insert(ClientId(id.clone()));

    let mut response = next.run(request).await;
    if issued {
        let cookie = format!("{cookie_name}={id}; Path=/; HttpOnly; SameSite=Lax");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                debug!(client = %id, "Issued client id");
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(client = %id, error = %e, "Could not encode client cookie"),
        }
    }
    response
}

impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ClientId>()
            .cloned()
            .ok_or_else(|| ApiError::StreamSetupFailure("request has no client id".to_string()))
    }
}
