use serde::{Deserialize, Serialize};

use crate::{
    constants::{MAX_EMAIL_LENGTH, MAX_USER_FIELD_LENGTH},
    cryptography::{hash_password, verify_password},
    error::{add_field_error, Error, FieldErrors, HtmlError},
    form::QueryParams,
    jwt::SessionData,
    middleware::require_session,
    pagination::{PageContext, PageRequest},
    schema::{Id, NewUser},
    state::State,
    validators::validate_username,
};

use super::serializers::{user_response, UserResponse};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterPayload {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

fn required_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_length: usize,
) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();

    if value.is_empty() {
        add_field_error(errors, field, "This field is required.");
    } else if value.chars().count() > max_length {
        add_field_error(
            errors,
            field,
            &format!("Ensure this field has no more than {max_length} characters."),
        );
    }
    value
}

pub async fn register(state: &State, payload: RegisterPayload) -> Result<UserResponse, Error> {
    let mut errors = FieldErrors::new();

    let email = required_field(&mut errors, "email", payload.email, MAX_EMAIL_LENGTH);
    if !email.is_empty() && !email.contains('@') {
        add_field_error(&mut errors, "email", "Enter a valid email address.");
    }
    let username = required_field(&mut errors, "username", payload.username, MAX_USER_FIELD_LENGTH);
    if !username.is_empty() {
        if let Err(message) = validate_username(&username) {
            add_field_error(&mut errors, "username", message);
        }
    }
    let first_name = required_field(
        &mut errors,
        "first_name",
        payload.first_name,
        MAX_USER_FIELD_LENGTH,
    );
    let last_name = required_field(
        &mut errors,
        "last_name",
        payload.last_name,
        MAX_USER_FIELD_LENGTH,
    );
    let password = payload.password.unwrap_or_default();
    if password.is_empty() {
        add_field_error(&mut errors, "password", "This field is required.");
    }

    if !errors.is_empty() {
        return Err(Error::validation(errors));
    }

    let user = NewUser {
        email,
        username,
        first_name,
        last_name,
        password: hash_password(&password)?,
    };
    let user = state.store.create_user(user).await?.ok_or_else(|| {
        HtmlError::InvalidRequest.new("A user with that email or username already exists.")
    })?;

    log::info!("Registered user {} ({})", user.username, user.id);
    user_response(state, None, user).await
}

pub async fn login(state: &State, payload: LoginPayload) -> Result<TokenResponse, Error> {
    let invalid = || HtmlError::InvalidRequest.new("Unable to log in with provided credentials.");

    let user = state
        .store
        .find_user_by_email(&payload.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password) {
        return Err(invalid());
    }

    Ok(TokenResponse {
        auth_token: state.sessions.generate(&user)?,
    })
}

pub async fn list_users(
    state: &State,
    viewer: Option<&SessionData>,
    query: &QueryParams,
) -> Result<PageContext<UserResponse>, Error> {
    let page = PageRequest::from_query(query)?;
    let (users, total) = state.store.list_users(page).await?;
    let context = PageContext::from_rows(users, total, page)?;

    let mut results = Vec::with_capacity(context.results.len());
    for user in context.results {
        results.push(user_response(state, viewer, user).await?);
    }

    Ok(PageContext {
        count: context.count,
        next: context.next,
        previous: context.previous,
        results,
    })
}

pub async fn get_user(
    state: &State,
    viewer: Option<&SessionData>,
    id: Id,
) -> Result<UserResponse, Error> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    user_response(state, viewer, user).await
}

pub async fn me(state: &State, viewer: Option<&SessionData>) -> Result<UserResponse, Error> {
    let session = require_session(viewer.cloned())?;
    get_user(state, Some(&session), session.user_id).await
}
