//! Session-related types.
//!
//! The session stores exactly three things for the checkout core: the
//! anonymous visitor token, the resolved cart-id pointer, and (when the
//! authentication collaborator has logged someone in) the current user id.
//! Everything a request needs from the session is pulled into an explicit
//! [`RequestIdentity`] value up front, so the resolver never reaches into
//! ambient session state itself.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use meridian_core::{CartId, UserId};

use crate::error::AppError;

/// Session keys for checkout data.
pub mod keys {
    /// Key for the anonymous visitor token.
    pub const VISITOR_TOKEN: &str = "visitor_token";

    /// Key for the resolved cart id pointer.
    pub const CART_ID: &str = "cart_id";

    /// Key for the authenticated user id, set by the auth collaborator.
    pub const CURRENT_USER: &str = "current_user";
}

/// The request's identity, as far as cart resolution is concerned.
///
/// Extracted once per request from the session. The visitor token is minted
/// and stored on first contact, so every request carries a stable anonymous
/// identity even before a cart exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestIdentity {
    /// Stable anonymous token for this browser session.
    pub session_token: String,
    /// Authenticated user, if any.
    pub user_id: Option<UserId>,
    /// Cart pointer remembered by a previous resolution, if any.
    pub cart_id: Option<CartId>,
}

impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(format!("session unavailable: {msg}")))?;

        let session_token = match session
            .get::<String>(keys::VISITOR_TOKEN)
            .await
            .map_err(session_error)?
        {
            Some(token) => token,
            None => {
                let token = uuid::Uuid::new_v4().to_string();
                session
                    .insert(keys::VISITOR_TOKEN, token.clone())
                    .await
                    .map_err(session_error)?;
                token
            }
        };

        let user_id = session
            .get::<UserId>(keys::CURRENT_USER)
            .await
            .map_err(session_error)?;
        let cart_id = session
            .get::<CartId>(keys::CART_ID)
            .await
            .map_err(session_error)?;

        Ok(Self {
            session_token,
            user_id,
            cart_id,
        })
    }
}

fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {err}"))
}

/// Remember the resolved cart id for subsequent requests.
///
/// Called by route handlers after every resolution, which is what makes
/// resolution idempotent across a session's requests.
pub async fn remember_cart_id(session: &Session, cart_id: CartId) -> Result<(), AppError> {
    session
        .insert(keys::CART_ID, cart_id)
        .await
        .map_err(session_error)
}

/// Drop the cart pointer after cart teardown.
pub async fn forget_cart_id(session: &Session) -> Result<(), AppError> {
    session
        .remove::<CartId>(keys::CART_ID)
        .await
        .map(|_| ())
        .map_err(session_error)
}
