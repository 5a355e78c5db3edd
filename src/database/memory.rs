use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    constants::{MAX_SMALL_INTEGER, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT},
    error::{Error, HtmlError},
    pagination::PageRequest,
    schema::{
        CartIngredient, Collection, Id, Ingredient, IngredientAmount, NewIngredient, NewTag,
        NewUser, Recipe, RecipeChanges, RecipeDraft, RecipeFilter, RecipePart, Tag, User, UserRole,
    },
    store::Store,
};

#[derive(Debug, Clone)]
struct RecipeIngredientRow {
    recipe_id: Id,
    ingredient_id: Id,
    amount: i32,
}

#[derive(Debug, Default)]
struct Tables {
    next_user: Id,
    next_tag: Id,
    next_ingredient: Id,
    next_recipe: Id,
    next_recipe_ingredient: Id,

    users: BTreeMap<Id, User>,
    tags: BTreeMap<Id, Tag>,
    ingredients: BTreeMap<Id, Ingredient>,
    recipes: BTreeMap<Id, Recipe>,
    /// (recipe_id, tag_id)
    recipe_tags: BTreeSet<(Id, Id)>,
    recipe_ingredients: BTreeMap<Id, RecipeIngredientRow>,
    /// (user_id, recipe_id)
    favorites: BTreeSet<(Id, Id)>,
    /// (user_id, recipe_id)
    shopping_cart: BTreeSet<(Id, Id)>,
    /// (user_id, author_id)
    follows: BTreeSet<(Id, Id)>,
}

fn next_id(sequence: &mut Id) -> Id {
    *sequence += 1;
    *sequence
}

fn page_of<T: Clone>(rows: &[T], page: PageRequest) -> Vec<T> {
    rows.iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}

/// Newest first, ties by id.
fn sort_recipes(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
}

impl Tables {
    fn collection(&self, collection: Collection) -> &BTreeSet<(Id, Id)> {
        match collection {
            Collection::Favorites => &self.favorites,
            Collection::ShoppingCart => &self.shopping_cart,
        }
    }

    fn collection_mut(&mut self, collection: Collection) -> &mut BTreeSet<(Id, Id)> {
        match collection {
            Collection::Favorites => &mut self.favorites,
            Collection::ShoppingCart => &mut self.shopping_cart,
        }
    }

    /// Same rules the database enforces through its constraints, checked
    /// before anything is written so a rejected write leaves no trace.
    fn check_recipe_links(&self, tags: &[Id], parts: &[IngredientAmount]) -> Result<(), Error> {
        let mut seen_tags = BTreeSet::new();
        for tag_id in tags {
            if !self.tags.contains_key(tag_id) {
                return Err(HtmlError::NotFound.new("Referenced object does not exist."));
            }
            if !seen_tags.insert(*tag_id) {
                return Err(HtmlError::InvalidRequest.new("Object already exists."));
            }
        }

        let mut seen_ingredients = BTreeSet::new();
        for part in parts {
            if !self.ingredients.contains_key(&part.id) {
                return Err(HtmlError::NotFound.new(&format!(
                    "Ingredient {} does not exist.",
                    part.id
                )));
            }
            if !seen_ingredients.insert(part.id) {
                return Err(HtmlError::InvalidRequest.new("Object already exists."));
            }
            check_range(part.amount as i64, MIN_INGREDIENT_AMOUNT)?;
        }

        Ok(())
    }

    fn replace_recipe_links(&mut self, recipe_id: Id, tags: &[Id], parts: &[IngredientAmount]) {
        self.recipe_tags.retain(|(r, _)| *r != recipe_id);
        self.recipe_ingredients.retain(|_, row| row.recipe_id != recipe_id);

        for tag_id in tags {
            self.recipe_tags.insert((recipe_id, *tag_id));
        }
        for part in parts {
            let id = next_id(&mut self.next_recipe_ingredient);
            self.recipe_ingredients.insert(
                id,
                RecipeIngredientRow {
                    recipe_id,
                    ingredient_id: part.id,
                    amount: part.amount,
                },
            );
        }
    }

    fn matches(&self, recipe: &Recipe, filter: &RecipeFilter) -> bool {
        if let Some(author) = filter.author {
            if recipe.author_id != Some(author) {
                return false;
            }
        }

        if !filter.tags.is_empty() {
            let tagged = self
                .recipe_tags
                .iter()
                .filter(|(r, _)| *r == recipe.id)
                .filter_map(|(_, tag_id)| self.tags.get(tag_id))
                .any(|tag| filter.tags.contains(&tag.slug));
            if !tagged {
                return false;
            }
        }

        if let Some(user_id) = filter.favorited_by {
            if !self.favorites.contains(&(user_id, recipe.id)) {
                return false;
            }
        }

        if let Some(user_id) = filter.in_cart_of {
            if !self.shopping_cart.contains(&(user_id, recipe.id)) {
                return false;
            }
        }

        true
    }
}

fn check_range(value: i64, min: i64) -> Result<(), Error> {
    if value < min || value > MAX_SMALL_INTEGER {
        return Err(HtmlError::InvalidRequest.default());
    }
    Ok(())
}

/// In-process [`Store`] holding every table behind one lock.
///
/// Each call takes the lock once, so uniqueness checks and the writes they
/// guard happen atomically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes a user's role. Admins are only ever promoted out of band.
    pub async fn set_role(&self, user_id: Id, role: UserRole) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| HtmlError::NotFound.default())?;
        user.role = role;
        Ok(())
    }

    /// Deletes a user. Their recipes stay with no author, their join rows go.
    pub async fn delete_user(&self, user_id: Id) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }

        for recipe in tables.recipes.values_mut() {
            if recipe.author_id == Some(user_id) {
                recipe.author_id = None;
            }
        }
        tables.favorites.retain(|(u, _)| *u != user_id);
        tables.shopping_cart.retain(|(u, _)| *u != user_id);
        tables
            .follows
            .retain(|(u, a)| *u != user_id && *a != user_id);

        Ok(true)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        let mut tables = self.tables.lock().await;

        let taken = tables.users.values().any(|u| {
            u.username == user.username || u.email.to_lowercase() == user.email.to_lowercase()
        });
        if taken {
            return Ok(None);
        }

        let id = next_id(&mut tables.next_user);
        let row = User {
            id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            password: user.password,
            role: UserRole::User,
        };
        tables.users.insert(id, row.clone());

        Ok(Some(row))
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let email = email.to_lowercase();
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), Error> {
        let tables = self.tables.lock().await;
        let all: Vec<User> = tables.users.values().cloned().collect();

        Ok((page_of(&all, page), all.len() as i64))
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Option<Tag>, Error> {
        let mut tables = self.tables.lock().await;

        if tables.tags.values().any(|t| t.slug == tag.slug) {
            return Ok(None);
        }

        let id = next_id(&mut tables.next_tag);
        let row = Tag {
            id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        };
        tables.tags.insert(id, row.clone());

        Ok(Some(row))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        Ok(self.tables.lock().await.tags.values().cloned().collect())
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        Ok(self.tables.lock().await.tags.get(&id).cloned())
    }

    async fn get_tags(&self, ids: &[Id]) -> Result<Vec<Tag>, Error> {
        Ok(self
            .tables
            .lock()
            .await
            .tags
            .values()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn create_ingredient(
        &self,
        ingredient: NewIngredient,
    ) -> Result<Option<Ingredient>, Error> {
        let mut tables = self.tables.lock().await;

        let taken = tables.ingredients.values().any(|i| {
            i.name == ingredient.name && i.measurement_unit == ingredient.measurement_unit
        });
        if taken {
            return Ok(None);
        }

        let id = next_id(&mut tables.next_ingredient);
        let row = Ingredient {
            id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        };
        tables.ingredients.insert(id, row.clone());

        Ok(Some(row))
    }

    async fn search_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        let tables = self.tables.lock().await;
        let prefix = prefix.map(str::to_lowercase);

        let mut rows: Vec<Ingredient> = tables
            .ingredients
            .values()
            .filter(|i| match &prefix {
                Some(prefix) => i.name.to_lowercase().starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(rows)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        Ok(self.tables.lock().await.ingredients.get(&id).cloned())
    }

    async fn create_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Recipe, Error> {
        let mut tables = self.tables.lock().await;

        if !tables.users.contains_key(&author_id) {
            return Err(HtmlError::NotFound.new("Referenced object does not exist."));
        }
        check_range(draft.cooking_time as i64, MIN_COOKING_TIME)?;
        tables.check_recipe_links(&draft.tags, &draft.ingredients)?;

        let id = next_id(&mut tables.next_recipe);
        let recipe = Recipe {
            id,
            author_id: Some(author_id),
            name: draft.name.clone(),
            text: draft.text.clone(),
            image: draft.image.clone(),
            cooking_time: draft.cooking_time,
            pub_date: Utc::now(),
        };
        tables.recipes.insert(id, recipe.clone());
        tables.replace_recipe_links(id, &draft.tags, &draft.ingredients);

        log::info!("Recipe {} created by user {}", id, author_id);
        Ok(recipe)
    }

    async fn update_recipe(&self, id: Id, changes: &RecipeChanges) -> Result<Recipe, Error> {
        let mut tables = self.tables.lock().await;

        if !tables.recipes.contains_key(&id) {
            return Err(HtmlError::NotFound.default());
        }
        if let Some(cooking_time) = changes.cooking_time {
            check_range(cooking_time as i64, MIN_COOKING_TIME)?;
        }
        tables.check_recipe_links(&changes.tags, &changes.ingredients)?;

        let recipe = tables
            .recipes
            .get_mut(&id)
            .ok_or_else(|| HtmlError::NotFound.default())?;
        if let Some(name) = &changes.name {
            recipe.name = name.clone();
        }
        if let Some(text) = &changes.text {
            recipe.text = Some(text.clone());
        }
        if let Some(image) = &changes.image {
            recipe.image = image.clone();
        }
        if let Some(cooking_time) = changes.cooking_time {
            recipe.cooking_time = cooking_time;
        }
        let updated = recipe.clone();

        tables.replace_recipe_links(id, &changes.tags, &changes.ingredients);

        Ok(updated)
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;

        if tables.recipes.remove(&id).is_none() {
            return Ok(false);
        }
        tables.recipe_tags.retain(|(r, _)| *r != id);
        tables.recipe_ingredients.retain(|_, row| row.recipe_id != id);
        tables.favorites.retain(|(_, r)| *r != id);
        tables.shopping_cart.retain(|(_, r)| *r != id);

        Ok(true)
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        Ok(self.tables.lock().await.recipes.get(&id).cloned())
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        let tables = self.tables.lock().await;

        let mut rows: Vec<Recipe> = tables
            .recipes
            .values()
            .filter(|r| tables.matches(r, filter))
            .cloned()
            .collect();
        sort_recipes(&mut rows);

        Ok((page_of(&rows, page), rows.len() as i64))
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        let tables = self.tables.lock().await;

        Ok(tables
            .recipe_tags
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(_, tag_id)| tables.tags.get(tag_id).cloned())
            .collect())
    }

    async fn list_recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, Error> {
        let tables = self.tables.lock().await;

        Ok(tables
            .recipe_ingredients
            .values()
            .filter(|row| row.recipe_id == recipe_id)
            .filter_map(|row| {
                tables
                    .ingredients
                    .get(&row.ingredient_id)
                    .map(|ingredient| RecipePart {
                        recipe_id,
                        ingredient_id: ingredient.id,
                        name: ingredient.name.clone(),
                        measurement_unit: ingredient.measurement_unit.clone(),
                        amount: row.amount,
                    })
            })
            .collect())
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, Error> {
        let tables = self.tables.lock().await;

        let mut rows: Vec<Recipe> = tables
            .recipes
            .values()
            .filter(|r| r.author_id == Some(author_id))
            .cloned()
            .collect();
        sort_recipes(&mut rows);
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }

        Ok(rows)
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, Error> {
        let tables = self.tables.lock().await;

        Ok(tables
            .recipes
            .values()
            .filter(|r| r.author_id == Some(author_id))
            .count() as i64)
    }

    async fn add_to_collection(
        &self,
        collection: Collection,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;

        if !tables.users.contains_key(&user_id) || !tables.recipes.contains_key(&recipe_id) {
            return Err(HtmlError::NotFound.new("Referenced object does not exist."));
        }

        Ok(tables
            .collection_mut(collection)
            .insert((user_id, recipe_id)))
    }

    async fn remove_from_collection(
        &self,
        collection: Collection,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;

        Ok(tables
            .collection_mut(collection)
            .remove(&(user_id, recipe_id)))
    }

    async fn is_in_collection(
        &self,
        collection: Collection,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<bool, Error> {
        let tables = self.tables.lock().await;

        Ok(tables.collection(collection).contains(&(user_id, recipe_id)))
    }

    async fn list_cart_ingredients(&self, user_id: Id) -> Result<Vec<CartIngredient>, Error> {
        let tables = self.tables.lock().await;

        let recipes: BTreeSet<Id> = tables
            .shopping_cart
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, r)| *r)
            .collect();

        Ok(tables
            .recipe_ingredients
            .values()
            .filter(|row| recipes.contains(&row.recipe_id))
            .filter_map(|row| {
                tables
                    .ingredients
                    .get(&row.ingredient_id)
                    .map(|ingredient| CartIngredient {
                        name: ingredient.name.clone(),
                        measurement_unit: ingredient.measurement_unit.clone(),
                        amount: row.amount,
                    })
            })
            .collect())
    }

    async fn follow(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        let mut tables = self.tables.lock().await;

        if user_id == author_id {
            return Err(HtmlError::InvalidRequest.default());
        }
        if !tables.users.contains_key(&user_id) || !tables.users.contains_key(&author_id) {
            return Err(HtmlError::NotFound.new("Referenced object does not exist."));
        }

        Ok(tables.follows.insert((user_id, author_id)))
    }

    async fn unfollow(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        Ok(self
            .tables
            .lock()
            .await
            .follows
            .remove(&(user_id, author_id)))
    }

    async fn is_following(&self, user_id: Id, author_id: Id) -> Result<bool, Error> {
        Ok(self
            .tables
            .lock()
            .await
            .follows
            .contains(&(user_id, author_id)))
    }

    async fn fetch_subscriptions(
        &self,
        user_id: Id,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), Error> {
        let tables = self.tables.lock().await;

        let authors: Vec<User> = tables
            .follows
            .iter()
            .filter(|(u, _)| *u == user_id)
            .filter_map(|(_, author_id)| tables.users.get(author_id).cloned())
            .collect();

        Ok((page_of(&authors, page), authors.len() as i64))
    }
}
