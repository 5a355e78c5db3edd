use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::Error,
    jwt::SessionData,
    media::MediaStorage,
    schema::{Collection, Id, Recipe, RecipePart, Tag, User},
    state::State,
};

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredientResponse {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for RecipeIngredientResponse {
    fn from(part: RecipePart) -> Self {
        Self {
            id: part.ingredient_id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeResponse {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: Option<UserResponse>,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: Option<String>,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortRecipeResponse {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl ShortRecipeResponse {
    pub fn new(media: &MediaStorage, recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            image: media.url(&recipe.image),
            name: recipe.name,
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub author: UserResponse,
    pub recipes: Vec<ShortRecipeResponse>,
    pub recipes_count: i64,
}

/// `is_subscribed` is always false for anonymous viewers.
pub async fn user_response(
    state: &State,
    viewer: Option<&SessionData>,
    user: User,
) -> Result<UserResponse, Error> {
    let is_subscribed = match viewer {
        Some(viewer) => state.store.is_following(viewer.user_id, user.id).await?,
        None => false,
    };

    Ok(UserResponse {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
    })
}

async fn collection_flag(
    state: &State,
    viewer: Option<&SessionData>,
    collection: Collection,
    recipe_id: Id,
) -> Result<bool, Error> {
    match viewer {
        Some(viewer) => {
            state
                .store
                .is_in_collection(collection, viewer.user_id, recipe_id)
                .await
        }
        None => Ok(false),
    }
}

pub async fn recipe_response(
    state: &State,
    viewer: Option<&SessionData>,
    recipe: Recipe,
) -> Result<RecipeResponse, Error> {
    let tags = state.store.list_recipe_tags(recipe.id).await?;
    let ingredients = state
        .store
        .list_recipe_parts(recipe.id)
        .await?
        .into_iter()
        .map(RecipeIngredientResponse::from)
        .collect();

    // the author may have been deleted since
    let author = match recipe.author_id {
        Some(author_id) => match state.store.get_user(author_id).await? {
            Some(user) => Some(user_response(state, viewer, user).await?),
            None => None,
        },
        None => None,
    };

    let is_favorited = collection_flag(state, viewer, Collection::Favorites, recipe.id).await?;
    let is_in_shopping_cart =
        collection_flag(state, viewer, Collection::ShoppingCart, recipe.id).await?;

    Ok(RecipeResponse {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        image: state.media.url(&recipe.image),
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    })
}

/// An author with at most `recipes_limit` of their newest recipes.
pub async fn subscription_response(
    state: &State,
    viewer: Option<&SessionData>,
    author: User,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionResponse, Error> {
    let recipes = state
        .store
        .list_author_recipes(author.id, recipes_limit)
        .await?
        .into_iter()
        .map(|recipe| ShortRecipeResponse::new(&state.media, recipe))
        .collect();
    let recipes_count = state.store.count_author_recipes(author.id).await?;

    Ok(SubscriptionResponse {
        author: user_response(state, viewer, author).await?,
        recipes,
        recipes_count,
    })
}
