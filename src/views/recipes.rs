use std::collections::BTreeSet;

use serde::Deserialize;

use crate::{
    constants::{MAX_NAME_LENGTH, MAX_SMALL_INTEGER, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT},
    document,
    error::{add_field_error, Error, FieldErrors, HtmlError},
    form::QueryParams,
    jwt::SessionData,
    media::{decode_image, DecodedImage},
    middleware::require_session,
    pagination::{PageContext, PageRequest},
    permissions::ActionType,
    schema::{Id, IngredientAmount, Recipe, RecipeChanges, RecipeDraft, RecipeFilter},
    shopping_list::shopping_list,
    state::State,
};

use super::serializers::{recipe_response, RecipeResponse};

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientPayload {
    pub id: Id,
    pub amount: i64,
}

/// Body of a recipe create or update, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i64>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientPayload>>,
}

/// A payload that passed every check that does not need to write.
#[derive(Debug, Clone)]
pub struct ValidRecipe {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<DecodedImage>,
    pub cooking_time: Option<i32>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

const REQUIRED: &str = "This field is required.";

fn in_range(value: i64, min: i64) -> Option<i32> {
    if (min..=MAX_SMALL_INTEGER).contains(&value) {
        i32::try_from(value).ok()
    } else {
        None
    }
}

/// Checks a payload, collecting every field error before reporting.
///
/// With `partial` the scalar fields may be omitted. Tags and ingredients are
/// always required since they are replaced as a whole. Unknown tag ids are a
/// field error, unknown ingredient ids are left for the write to reject.
pub async fn validate_recipe(
    state: &State,
    payload: RecipePayload,
    partial: bool,
) -> Result<ValidRecipe, Error> {
    let mut errors = FieldErrors::new();

    let name = match payload.name.map(|name| name.trim().to_string()) {
        Some(name) if name.is_empty() => {
            add_field_error(&mut errors, "name", "This field may not be blank.");
            None
        }
        Some(name) if name.chars().count() > MAX_NAME_LENGTH => {
            add_field_error(
                &mut errors,
                "name",
                &format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters."),
            );
            None
        }
        Some(name) => Some(name),
        None => {
            if !partial {
                add_field_error(&mut errors, "name", REQUIRED);
            }
            None
        }
    };

    let cooking_time = match payload.cooking_time {
        Some(value) => {
            let checked = in_range(value, MIN_COOKING_TIME);
            if checked.is_none() {
                add_field_error(
                    &mut errors,
                    "cooking_time",
                    &format!(
                        "Cooking time must be between {MIN_COOKING_TIME} and {MAX_SMALL_INTEGER}."
                    ),
                );
            }
            checked
        }
        None => {
            if !partial {
                add_field_error(&mut errors, "cooking_time", REQUIRED);
            }
            None
        }
    };

    let image = match payload.image.as_deref() {
        Some(value) => match decode_image(value) {
            Ok(image) => Some(image),
            Err(message) => {
                add_field_error(&mut errors, "image", message);
                None
            }
        },
        None => {
            if !partial {
                add_field_error(&mut errors, "image", REQUIRED);
            }
            None
        }
    };

    let tags = payload.tags.unwrap_or_default();
    if tags.is_empty() {
        add_field_error(&mut errors, "tags", "At least one tag is required.");
    } else if tags.iter().collect::<BTreeSet<_>>().len() != tags.len() {
        add_field_error(&mut errors, "tags", "Recipe tags must not repeat.");
    } else {
        let known = state.store.get_tags(&tags).await?;
        for tag_id in &tags {
            if !known.iter().any(|tag| tag.id == *tag_id) {
                add_field_error(
                    &mut errors,
                    "tags",
                    &format!("Invalid pk \"{tag_id}\" - object does not exist."),
                );
            }
        }
    }

    let submitted = payload.ingredients.unwrap_or_default();
    let mut ingredients = Vec::with_capacity(submitted.len());
    if submitted.is_empty() {
        add_field_error(&mut errors, "ingredients", "At least one ingredient is required.");
    } else if submitted
        .iter()
        .map(|part| part.id)
        .collect::<BTreeSet<_>>()
        .len()
        != submitted.len()
    {
        add_field_error(&mut errors, "ingredients", "Recipe ingredients must not repeat.");
    } else {
        for part in &submitted {
            match in_range(part.amount, MIN_INGREDIENT_AMOUNT) {
                Some(amount) => ingredients.push(IngredientAmount {
                    id: part.id,
                    amount,
                }),
                None => add_field_error(
                    &mut errors,
                    "ingredients",
                    &format!(
                        "Amount must be between {MIN_INGREDIENT_AMOUNT} and {MAX_SMALL_INTEGER}."
                    ),
                ),
            }
        }
    }

    if !errors.is_empty() {
        log::debug!("Recipe payload rejected: {errors:?}");
        return Err(Error::validation(errors));
    }

    Ok(ValidRecipe {
        name,
        text: payload.text,
        image,
        cooking_time,
        tags,
        ingredients,
    })
}

fn can_modify(session: &SessionData, recipe: &Recipe) -> bool {
    ActionType::ManageAllRecipes.authenticate(session)
        || (recipe.author_id == Some(session.user_id)
            && ActionType::ManageOwnRecipes.authenticate(session))
}

/// Recipe the session may change, or why not.
async fn owned_recipe(state: &State, session: &SessionData, id: Id) -> Result<Recipe, Error> {
    let recipe = state
        .store
        .get_recipe(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    if !can_modify(session, &recipe) {
        return Err(HtmlError::Forbidden.default());
    }
    Ok(recipe)
}

/// Reads the listing filters.
///
/// `is_favorited` and `is_in_shopping_cart` only narrow the listing when true
/// and the viewer is known, otherwise they are ignored.
pub fn recipe_filter(
    viewer: Option<&SessionData>,
    query: &QueryParams,
) -> Result<RecipeFilter, Error> {
    let viewer_id = viewer.map(|session| session.user_id);
    let favorited = query.get_bool("is_favorited")?.unwrap_or(false);
    let in_cart = query.get_bool("is_in_shopping_cart")?.unwrap_or(false);

    Ok(RecipeFilter {
        author: query.get_number::<Id>("author")?,
        tags: query.get_all("tags").into_iter().map(str::to_owned).collect(),
        favorited_by: viewer_id.filter(|_| favorited),
        in_cart_of: viewer_id.filter(|_| in_cart),
    })
}

pub async fn list_recipes(
    state: &State,
    viewer: Option<&SessionData>,
    query: &QueryParams,
) -> Result<PageContext<RecipeResponse>, Error> {
    let filter = recipe_filter(viewer, query)?;
    let page = PageRequest::from_query(query)?;

    let (recipes, total) = state.store.fetch_recipes(&filter, page).await?;
    let context = PageContext::from_rows(recipes, total, page)?;

    let mut results = Vec::with_capacity(context.results.len());
    for recipe in context.results {
        results.push(recipe_response(state, viewer, recipe).await?);
    }

    Ok(PageContext {
        count: context.count,
        next: context.next,
        previous: context.previous,
        results,
    })
}

pub async fn get_recipe(
    state: &State,
    viewer: Option<&SessionData>,
    id: Id,
) -> Result<RecipeResponse, Error> {
    let recipe = state
        .store
        .get_recipe(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    recipe_response(state, viewer, recipe).await
}

pub async fn create_recipe(
    state: &State,
    viewer: Option<&SessionData>,
    payload: RecipePayload,
) -> Result<RecipeResponse, Error> {
    let session = require_session(viewer.cloned())?;
    session.authenticate(ActionType::CreateRecipes)?;

    let valid = validate_recipe(state, payload, false).await?;
    let (Some(name), Some(cooking_time), Some(image)) =
        (valid.name, valid.cooking_time, valid.image.as_ref())
    else {
        return Err(HtmlError::InvalidRequest.default());
    };

    let stored_image = state.media.save(image).await?;
    let draft = RecipeDraft {
        name,
        text: valid.text,
        image: stored_image.clone(),
        cooking_time,
        tags: valid.tags,
        ingredients: valid.ingredients,
    };

    let recipe = match state.store.create_recipe(session.user_id, &draft).await {
        Ok(recipe) => recipe,
        Err(e) => {
            state.media.remove(&stored_image).await;
            return Err(e);
        }
    };

    recipe_response(state, Some(&session), recipe).await
}

pub async fn update_recipe(
    state: &State,
    viewer: Option<&SessionData>,
    id: Id,
    payload: RecipePayload,
) -> Result<RecipeResponse, Error> {
    let session = require_session(viewer.cloned())?;
    let current = owned_recipe(state, &session, id).await?;

    let valid = validate_recipe(state, payload, true).await?;

    let stored_image = match valid.image.as_ref() {
        Some(image) => Some(state.media.save(image).await?),
        None => None,
    };
    let changes = RecipeChanges {
        name: valid.name,
        text: valid.text,
        image: stored_image.clone(),
        cooking_time: valid.cooking_time,
        tags: valid.tags,
        ingredients: valid.ingredients,
    };

    let recipe = match state.store.update_recipe(id, &changes).await {
        Ok(recipe) => recipe,
        Err(e) => {
            if let Some(stored_image) = &stored_image {
                state.media.remove(stored_image).await;
            }
            return Err(e);
        }
    };

    if stored_image.is_some() {
        state.media.remove(&current.image).await;
    }

    recipe_response(state, Some(&session), recipe).await
}

pub async fn delete_recipe(
    state: &State,
    viewer: Option<&SessionData>,
    id: Id,
) -> Result<(), Error> {
    let session = require_session(viewer.cloned())?;
    let recipe = owned_recipe(state, &session, id).await?;

    if !state.store.delete_recipe(id).await? {
        return Err(HtmlError::NotFound.default());
    }
    state.media.remove(&recipe.image).await;

    log::info!("Recipe {} deleted by user {}", id, session.user_id);
    Ok(())
}

/// PDF of the viewer's aggregated shopping list.
pub async fn download_shopping_cart(
    state: &State,
    viewer: Option<&SessionData>,
) -> Result<Vec<u8>, Error> {
    let session = require_session(viewer.cloned())?;
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let items = shopping_list(state.store.as_ref(), session.user_id).await?;
    let bytes = document::render(&items, &state.font)?;

    Ok(bytes)
}
