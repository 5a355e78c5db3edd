use warp::{reject::Rejection, Filter};

use crate::{
    error::{Error, HtmlError},
    jwt::{SessionData, SessionKeys},
};

/// Token from `Authorization: Token <jwt>` or `Authorization: Bearer <jwt>`.
fn token_from_header(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    match scheme {
        "Token" | "Bearer" => Some(token.trim()),
        _ => None,
    }
}

/// Resolves the acting user, if any.
///
/// A request without credentials is anonymous. A request carrying a token
/// that does not verify is rejected with 401 rather than treated as anonymous.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>("session"))
        .and_then(move |header: Option<String>, cookie: Option<String>| {
            let keys = keys.clone();
            async move {
                let token = header
                    .as_deref()
                    .and_then(token_from_header)
                    .map(str::to_owned)
                    .or(cookie);

                match token {
                    None => Ok(None),
                    Some(token) => keys
                        .verify(&token)
                        .map(Some)
                        .map_err(warp::reject::custom),
                }
            }
        })
}

pub fn require_session(session: Option<SessionData>) -> Result<SessionData, Error> {
    session.ok_or_else(|| HtmlError::Unauthorized.default())
}
