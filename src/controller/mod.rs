//! HTTP controllers mounted under `/api/push`.

use actix_web::HttpRequest;

use crate::{
    configuration::{AppState, State},
    error::Error,
};

pub mod health;
pub mod send;
pub mod subscriptions;
pub mod vapid_keys;

/// Accepts the configured token either bare or as a bearer credential.
pub(crate) fn authorize(
    state: &AppState<State>,
    req: &HttpRequest,
) -> Result<(), Error> {
    let header = match req.headers().get("authorization") {
        Some(value) => value.to_str().map_err(|_| Error::Unauthorized)?,
        None => return Err(Error::Unauthorized),
    };
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();

    if token.is_empty() || token != state.config.auth {
        return Err(Error::Unauthorized);
    }

    Ok(())
}
