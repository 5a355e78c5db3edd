use crate::{
    error::{Error, HtmlError},
    jwt::SessionData,
    middleware::require_session,
    permissions::ActionType,
    schema::{Collection, Id, Recipe},
    state::State,
};

use super::serializers::ShortRecipeResponse;

fn action(collection: Collection) -> ActionType {
    match collection {
        Collection::Favorites => ActionType::ManageOwnFavorites,
        Collection::ShoppingCart => ActionType::ManageOwnShoppingCart,
    }
}

async fn existing_recipe(state: &State, recipe_id: Id) -> Result<Recipe, Error> {
    state
        .store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())
}

/// Adds a recipe to the viewer's favorites or cart. A second add is rejected.
pub async fn add_to_collection(
    state: &State,
    viewer: Option<&SessionData>,
    collection: Collection,
    recipe_id: Id,
) -> Result<ShortRecipeResponse, Error> {
    let session = require_session(viewer.cloned())?;
    session.authenticate(action(collection))?;
    let recipe = existing_recipe(state, recipe_id).await?;

    if !state
        .store
        .add_to_collection(collection, session.user_id, recipe_id)
        .await?
    {
        return Err(HtmlError::InvalidRequest.new(&format!(
            "Recipe is already in {}.",
            collection.label()
        )));
    }

    Ok(ShortRecipeResponse::new(&state.media, recipe))
}

/// Removing something that is not there is an error, not a no-op.
pub async fn remove_from_collection(
    state: &State,
    viewer: Option<&SessionData>,
    collection: Collection,
    recipe_id: Id,
) -> Result<(), Error> {
    let session = require_session(viewer.cloned())?;
    session.authenticate(action(collection))?;
    existing_recipe(state, recipe_id).await?;

    if !state
        .store
        .remove_from_collection(collection, session.user_id, recipe_id)
        .await?
    {
        return Err(HtmlError::InvalidRequest.new(&format!(
            "Recipe already removed from {}.",
            collection.label()
        )));
    }

    Ok(())
}
