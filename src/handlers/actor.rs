use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::user::Actor;
use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Reads the acting user from the identity headers set by the gateway.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::missing_actor(format!("{} header is required", USER_ID_HEADER)))?;
    let user_id = raw
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| {
            AppError::missing_actor(format!("{} header must be a UUID", USER_ID_HEADER))
        })?;

    let is_admin = headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));

    Ok(if is_admin {
        Actor::admin(user_id)
    } else {
        Actor::customer(user_id)
    })
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(actor_from_headers(req.headers()))
    }
}
