use std::convert::Infallible;

use serde::{de::DeserializeOwned, Serialize};
use warp::{
    filters::body::BodyDeserializeError,
    http::{header, StatusCode},
    reject::{self, Rejection},
    reply::{self, Response},
    Filter, Reply,
};

use crate::{
    constants::{MAX_BODY_SIZE, SHOPPING_LIST_FILENAME},
    error::{Error, HtmlError},
    form::QueryParams,
    jwt::SessionData,
    middleware::with_possible_session,
    schema::{Collection, Id},
    state::State,
    views::{catalog, collections, recipes, subscriptions, users},
};

fn with_state(state: State) -> impl Filter<Extract = (State,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn with_query() -> impl Filter<Extract = (QueryParams,), Error = Rejection> + Clone {
    warp::query::<Vec<(String, String)>>().map(QueryParams::from_pairs)
}

fn with_json<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn respond<T: Serialize>(result: Result<T, Error>, status: StatusCode) -> Response {
    match result {
        Ok(body) => reply::with_status(reply::json(&body), status).into_response(),
        Err(e) => e.to_response(),
    }
}

fn no_content(result: Result<(), Error>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.to_response(),
    }
}

fn attachment(result: Result<Vec<u8>, Error>) -> Response {
    match result {
        Ok(bytes) => {
            let disposition = format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\"");
            let reply = reply::with_header(bytes, header::CONTENT_TYPE, "application/pdf");
            reply::with_header(reply, header::CONTENT_DISPOSITION, disposition).into_response()
        }
        Err(e) => e.to_response(),
    }
}

/// Full HTTP surface of the service.
pub fn routes(state: State) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let media = warp::path("media").and(warp::fs::dir(state.media.root().to_path_buf()));

    recipe_routes(state.clone())
        .or(catalog_routes(state.clone()))
        .or(user_routes(state))
        .or(media)
        .recover(recover)
        .with(warp::log("foodgram::api"))
}

fn recipe_routes(state: State) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let session = with_possible_session(state.sessions.clone());

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(|session: Option<SessionData>, state: State| async move {
            attachment(recipes::download_shopping_cart(&state, session.as_ref()).await)
        });

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_query())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(
            |query: QueryParams, session: Option<SessionData>, state: State| async move {
                respond(
                    recipes::list_recipes(&state, session.as_ref(), &query).await,
                    StatusCode::OK,
                )
            },
        );

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_json())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(
            |payload: recipes::RecipePayload, session: Option<SessionData>, state: State| async move {
                respond(
                    recipes::create_recipe(&state, session.as_ref(), payload).await,
                    StatusCode::CREATED,
                )
            },
        );

    let detail = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(|id: Id, session: Option<SessionData>, state: State| async move {
            respond(
                recipes::get_recipe(&state, session.as_ref(), id).await,
                StatusCode::OK,
            )
        });

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_json())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(
            |id: Id,
             payload: recipes::RecipePayload,
             session: Option<SessionData>,
             state: State| async move {
                respond(
                    recipes::update_recipe(&state, session.as_ref(), id, payload).await,
                    StatusCode::OK,
                )
            },
        );

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(|id: Id, session: Option<SessionData>, state: State| async move {
            no_content(recipes::delete_recipe(&state, session.as_ref(), id).await)
        });

    let favorite = collection_routes("favorite", Collection::Favorites, state.clone());
    let shopping_cart = collection_routes("shopping_cart", Collection::ShoppingCart, state);

    download
        .or(list)
        .unify()
        .or(create)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(shopping_cart)
        .unify()
}

/// `POST` adds, `DELETE` removes, both under `/recipes/{id}/<segment>/`.
fn collection_routes(
    segment: &'static str,
    collection: Collection,
    state: State,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let session = with_possible_session(state.sessions.clone());
    let base = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = base
        .clone()
        .and(warp::post())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(move |id: Id, session: Option<SessionData>, state: State| async move {
            respond(
                collections::add_to_collection(&state, session.as_ref(), collection, id).await,
                StatusCode::CREATED,
            )
        });

    let remove = base
        .and(warp::delete())
        .and(session)
        .and(with_state(state))
        .then(move |id: Id, session: Option<SessionData>, state: State| async move {
            no_content(
                collections::remove_from_collection(&state, session.as_ref(), collection, id).await,
            )
        });

    add.or(remove).unify()
}

fn catalog_routes(state: State) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let tags = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(|state: State| async move {
            respond(catalog::list_tags(state.store.as_ref()).await, StatusCode::OK)
        });

    let tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(|id: Id, state: State| async move {
            respond(catalog::get_tag(state.store.as_ref(), id).await, StatusCode::OK)
        });

    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(with_query())
        .and(with_state(state.clone()))
        .then(|query: QueryParams, state: State| async move {
            respond(
                catalog::search_ingredients(state.store.as_ref(), &query).await,
                StatusCode::OK,
            )
        });

    let ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_state(state))
        .then(|id: Id, state: State| async move {
            respond(
                catalog::get_ingredient(state.store.as_ref(), id).await,
                StatusCode::OK,
            )
        });

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
}

fn user_routes(state: State) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let session = with_possible_session(state.sessions.clone());

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(with_json())
        .and(with_state(state.clone()))
        .then(|payload: users::LoginPayload, state: State| async move {
            respond(users::login(&state, payload).await, StatusCode::CREATED)
        });

    let register = warp::path!("users")
        .and(warp::post())
        .and(with_json())
        .and(with_state(state.clone()))
        .then(|payload: users::RegisterPayload, state: State| async move {
            respond(users::register(&state, payload).await, StatusCode::CREATED)
        });

    let list = warp::path!("users")
        .and(warp::get())
        .and(with_query())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(
            |query: QueryParams, session: Option<SessionData>, state: State| async move {
                respond(
                    users::list_users(&state, session.as_ref(), &query).await,
                    StatusCode::OK,
                )
            },
        );

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(|session: Option<SessionData>, state: State| async move {
            respond(users::me(&state, session.as_ref()).await, StatusCode::OK)
        });

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_query())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(
            |query: QueryParams, session: Option<SessionData>, state: State| async move {
                respond(
                    subscriptions::list_subscriptions(&state, session.as_ref(), &query).await,
                    StatusCode::OK,
                )
            },
        );

    let detail = warp::path!("users" / Id)
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(|id: Id, session: Option<SessionData>, state: State| async move {
            respond(
                users::get_user(&state, session.as_ref(), id).await,
                StatusCode::OK,
            )
        });

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(with_query())
        .and(session.clone())
        .and(with_state(state.clone()))
        .then(
            |id: Id, query: QueryParams, session: Option<SessionData>, state: State| async move {
                respond(
                    subscriptions::subscribe(&state, session.as_ref(), id, &query).await,
                    StatusCode::CREATED,
                )
            },
        );

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(session)
        .and(with_state(state))
        .then(|id: Id, session: Option<SessionData>, state: State| async move {
            no_content(subscriptions::unsubscribe(&state, session.as_ref(), id).await)
        });

    login
        .or(register)
        .unify()
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(subscriptions)
        .unify()
        .or(detail)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
}

/// Turns every rejection into the JSON error shape the handlers use.
pub async fn recover(rejection: Rejection) -> Result<Response, Infallible> {
    let error = if rejection.is_not_found() {
        HtmlError::NotFound.default()
    } else if let Some(e) = rejection.find::<Error>() {
        e.clone()
    } else if let Some(e) = rejection.find::<BodyDeserializeError>() {
        HtmlError::InvalidRequest.new(&e.to_string())
    } else if rejection.find::<reject::InvalidQuery>().is_some() {
        HtmlError::InvalidRequest.new("Invalid query string.")
    } else if rejection.find::<reject::PayloadTooLarge>().is_some() {
        status_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large.")
    } else if rejection.find::<reject::UnsupportedMediaType>().is_some() {
        status_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type.")
    } else if rejection.find::<reject::LengthRequired>().is_some() {
        status_error(StatusCode::LENGTH_REQUIRED, "Content length required.")
    } else if rejection.find::<reject::MethodNotAllowed>().is_some() {
        status_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else {
        log::error!("Unhandled rejection: {rejection:?}");
        HtmlError::InternalServerError.default()
    };

    Ok(error.to_response())
}

fn status_error(status: StatusCode, info: &str) -> Error {
    Error {
        code: status.as_u16(),
        info: Some(info.to_string()),
        fields: None,
    }
}
