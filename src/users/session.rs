use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use thiserror::Error;

use crate::config::AppConfig;
use crate::data::DBConnection;

use super::data::*;
use super::helpers::find_user_by_token;

pub const ADMIN_TOKEN_USER: &str = "admin";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("unknown token")]
    Invalid,
    #[error("admin role required")]
    Forbidden,
    #[error("session lookup failed: {0}")]
    Lookup(String),
}

/// An authorized caller. Route handlers take this as a guard; the board logic
/// itself never sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserID,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn bearer_token<'r>(request: &'r Request<'_>) -> Option<&'r str> {
    request
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn resolve_session(token: &str, request: &Request<'_>) -> Result<Session, AuthError> {
    let admin_token = request
        .rocket()
        .state::<AppConfig>()
        .and_then(|config| config.admin_token.as_deref());
    if admin_token == Some(token) {
        return Ok(Session {
            user_id: ADMIN_TOKEN_USER.to_string(),
            role: Role::Admin,
        });
    }

    let db_connection = request
        .rocket()
        .state::<DBConnection>()
        .ok_or_else(|| AuthError::Lookup("no database".to_string()))?;
    let db_connection = db_connection
        .lock()
        .map_err(|e| AuthError::Lookup(e.to_string()))?;

    match find_user_by_token(token, &db_connection) {
        Ok(Some(user)) => Ok(Session {
            user_id: user.id,
            role: user.role,
        }),
        Ok(None) => Err(AuthError::Invalid),
        Err(e) => Err(AuthError::Lookup(e.to_string())),
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Session {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = match bearer_token(request) {
            Some(token) => token,
            None => return Outcome::Error((Status::Unauthorized, AuthError::Missing)),
        };

        match resolve_session(token, request) {
            Ok(session) => Outcome::Success(session),
            Err(AuthError::Lookup(e)) => {
                tracing::error!(error = %e, "session lookup failed");
                Outcome::Error((Status::InternalServerError, AuthError::Lookup(e)))
            }
            Err(e) => {
                tracing::debug!(error = %e, "request not authorized");
                Outcome::Error((Status::Unauthorized, e))
            }
        }
    }
}

/// A session holding the `ADMIN` role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession(pub Session);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminSession {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.guard::<Session>().await {
            Outcome::Success(session) if session.is_admin() => Outcome::Success(AdminSession(session)),
            Outcome::Success(_) => Outcome::Error((Status::Forbidden, AuthError::Forbidden)),
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(status) => Outcome::Forward(status),
        }
    }
}
