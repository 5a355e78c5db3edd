use crate::{
    error::{Error, HtmlError},
    form::QueryParams,
    jwt::SessionData,
    middleware::require_session,
    pagination::{PageContext, PageRequest},
    permissions::ActionType,
    schema::Id,
    state::State,
};

use super::serializers::{subscription_response, SubscriptionResponse};

fn recipes_limit(query: &QueryParams) -> Result<Option<i64>, Error> {
    match query.get_number::<i64>("recipes_limit")? {
        Some(limit) if limit < 0 => Err(HtmlError::InvalidRequest.new("Invalid value for 'recipes_limit'")),
        limit => Ok(limit),
    }
}

pub async fn subscribe(
    state: &State,
    viewer: Option<&SessionData>,
    author_id: Id,
    query: &QueryParams,
) -> Result<SubscriptionResponse, Error> {
    let session = require_session(viewer.cloned())?;
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let limit = recipes_limit(query)?;

    let author = state
        .store
        .get_user(author_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    if author.id == session.user_id {
        return Err(HtmlError::InvalidRequest.new("You cannot subscribe to yourself."));
    }
    if !state.store.follow(session.user_id, author.id).await? {
        return Err(HtmlError::InvalidRequest.new("You are already subscribed to this author."));
    }

    log::debug!("User {} subscribed to {}", session.user_id, author.id);
    subscription_response(state, Some(&session), author, limit).await
}

pub async fn unsubscribe(
    state: &State,
    viewer: Option<&SessionData>,
    author_id: Id,
) -> Result<(), Error> {
    let session = require_session(viewer.cloned())?;
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let author = state
        .store
        .get_user(author_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    if !state.store.unfollow(session.user_id, author.id).await? {
        return Err(HtmlError::InvalidRequest.new(
            "You have already unsubscribed or were never subscribed.",
        ));
    }

    Ok(())
}

/// Authors the viewer follows, each with a capped slice of their recipes.
pub async fn list_subscriptions(
    state: &State,
    viewer: Option<&SessionData>,
    query: &QueryParams,
) -> Result<PageContext<SubscriptionResponse>, Error> {
    let session = require_session(viewer.cloned())?;
    let limit = recipes_limit(query)?;
    let page = PageRequest::from_query(query)?;

    let (authors, total) = state.store.fetch_subscriptions(session.user_id, page).await?;
    let context = PageContext::from_rows(authors, total, page)?;

    let mut results = Vec::with_capacity(context.results.len());
    for author in context.results {
        results.push(subscription_response(state, Some(&session), author, limit).await?);
    }

    Ok(PageContext {
        count: context.count,
        next: context.next,
        previous: context.previous,
        results,
    })
}
