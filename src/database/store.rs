use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    actions,
    database::error::QueryError,
    error::Error,
    pagination::PageRequest,
    schema::{
        CartIngredient, Collection, Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe,
        RecipeChanges, RecipeDraft, RecipeFilter, RecipePart, Tag, User,
    },
};

/// Persistence contract of the service.
///
/// Uniqueness of join rows is enforced by the implementation itself: the
/// `add_*`/`follow` calls report a duplicate by returning `false`, never by a
/// separate existence check done beforehand by the caller.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns `None` when the email or username is taken.
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, Error>;
    async fn get_user(&self, id: Id) -> Result<Option<User>, Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), Error>;

    /// Returns `None` when the slug is taken.
    async fn create_tag(&self, tag: NewTag) -> Result<Option<Tag>, Error>;
    async fn list_tags(&self) -> Result<Vec<Tag>, Error>;
    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error>;
    async fn get_tags(&self, ids: &[Id]) -> Result<Vec<Tag>, Error>;

    /// Returns `None` when the (name, unit) pair already exists.
    async fn create_ingredient(&self, ingredient: NewIngredient)
        -> Result<Option<Ingredient>, Error>;
    async fn search_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, Error>;
    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error>;

    /// All-or-nothing: an unknown ingredient id leaves no recipe behind.
    async fn create_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Recipe, Error>;
    /// All-or-nothing full replace of the tag and ingredient sets.
    async fn update_recipe(&self, id: Id, changes: &RecipeChanges) -> Result<Recipe, Error>;
    async fn delete_recipe(&self, id: Id) -> Result<bool, Error>;
    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error>;
    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<(Vec<Recipe>, i64), Error>;
    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error>;
    async fn list_recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, Error>;
    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, Error>;
    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, Error>;

    async fn add_to_collection(
        &self,
        collection: Collection,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error>;
    async fn remove_from_collection(
        &self,
        collection: Collection,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error>;
    async fn is_in_collection(
        &self,
        collection: Collection,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error>;
    async fn list_cart_ingredients(&self, user_id: Id) -> Result<Vec<CartIngredient>, Error>;

    async fn follow(&self, user_id: Id, author_id: Id) -> Result<bool, Error>;
    async fn unfollow(&self, user_id: Id, author_id: Id) -> Result<bool, Error>;
    async fn is_following(&self, user_id: Id, author_id: Id) -> Result<bool, Error>;
    async fn fetch_subscriptions(
        &self,
        user_id: Id,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), Error>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(QueryError::from)?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(QueryError::from)?;

        log::info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        actions::users::register_user(&user, &self.pool).await
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        actions::users::get_user_by_id(&self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        actions::users::get_user_by_email(&self.pool, email).await
    }

    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), Error> {
        actions::users::fetch_users(page, &self.pool).await
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Option<Tag>, Error> {
        actions::tags::create_tag(&tag, &self.pool).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        actions::tags::list_tags(&self.pool).await
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        actions::tags::get_tag(id, &self.pool).await
    }

    async fn get_tags(&self, ids: &[Id]) -> Result<Vec<Tag>, Error> {
        actions::tags::get_tags(ids, &self.pool).await
    }

    async fn create_ingredient(
        &self,
        ingredient: NewIngredient,
    ) -> Result<Option<Ingredient>, Error> {
        actions::ingredients::create_ingredient(&ingredient, &self.pool).await
    }

    async fn search_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        actions::ingredients::search_ingredients(prefix, &self.pool).await
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        actions::ingredients::get_ingredient(id, &self.pool).await
    }

    async fn create_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Recipe, Error> {
        actions::recipes::create_recipe(author_id, draft, &self.pool).await
    }

    async fn update_recipe(&self, id: Id, changes: &RecipeChanges) -> Result<Recipe, Error> {
        actions::recipes::update_recipe(id, changes, &self.pool).await
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, Error> {
        actions::recipes::delete_recipe(id, &self.pool).await
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        actions::recipes::get_recipe(id, &self.pool).await
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        actions::recipes::fetch_recipes(filter, page, &self.pool).await
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        actions::tags::list_recipe_tags(&self.pool, recipe_id).await
    }

    async fn list_recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, Error> {
        actions::recipes::list_recipe_parts(&self.pool, recipe_id).await
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, Error> {
        actions::recipes::list_author_recipes(author_id, limit, &self.pool).await
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, Error> {
        actions::recipes::count_author_recipes(author_id, &self.pool).await
    }

    async fn add_to_collection(
        &self,
        collection: Collection,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        actions::collections::add_to_collection(collection, user_id, recipe_id, &self.pool).await
    }

    async fn remove_from_collection(
        &self,
        collection: Collection,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        actions::collections::remove_from_collection(collection, user_id, recipe_id, &self.pool)
            .await
    }

    async fn is_in_collection(
        &self,
        collection: Collection,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        actions::collections::is_in_collection(collection, user_id, recipe_id, &self.pool).await
    }

    async fn list_cart_ingredients(&self, user_id: Id) -> Result<Vec<CartIngredient>, Error> {
        actions::collections::list_cart_ingredients(user_id, &self.pool).await
    }

    async fn follow(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        actions::follows::follow(user_id, author_id, &self.pool).await
    }

    async fn unfollow(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        actions::follows::unfollow(user_id, author_id, &self.pool).await
    }

    async fn is_following(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        actions::follows::is_following(user_id, author_id, &self.pool).await
    }

    async fn fetch_subscriptions(
        &self,
        user_id: Id,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), Error> {
        actions::follows::fetch_subscriptions(user_id, page, &self.pool).await
    }
}
