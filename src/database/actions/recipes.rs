use crate::{
    database::error::QueryError,
    error::{Error, HtmlError},
    pagination::PageRequest,
    schema::{Id, IngredientAmount, Recipe, RecipeChanges, RecipeDraft, RecipeFilter, RecipePart, RecipeRow},
};

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(user_id) = filter.favorited_by {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    if let Some(user_id) = filter.in_cart_of {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM shopping_cart sc WHERE sc.recipe_id = r.id AND sc.user_id = ",
            )
            .push_bind(user_id)
            .push(")");
    }

    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(|row| row.recipe).collect(), total_count))
}

pub async fn list_recipe_parts(
    pool: &Pool<Postgres>,
    recipe_id: Id,
) -> Result<Vec<RecipePart>, Error> {
    let rows: Vec<RecipePart> = sqlx::query_as("
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ")
    .bind(recipe_id)
    .fetch_all(pool).await.map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn create_recipe(
    author_id: Id,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(&draft.image)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    insert_recipe_tags(&mut tr, recipe.id, &draft.tags).await?;
    insert_recipe_parts(&mut tr, recipe.id, &draft.ingredients).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Recipe {} created by user {}", recipe.id, author_id);
    Ok(recipe)
}

/// Writes the scalar changes, then clears and reinserts both related sets.
pub async fn update_recipe(
    id: Id,
    changes: &RecipeChanges,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe: Option<Recipe> = sqlx::query_as(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        image = COALESCE($3, image),
        cooking_time = COALESCE($4, cooking_time)
        WHERE id = $5
        RETURNING *
    ",
    )
    .bind(&changes.name)
    .bind(&changes.text)
    .bind(&changes.image)
    .bind(changes.cooking_time)
    .bind(id)
    .fetch_optional(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    let recipe = recipe.ok_or_else(|| HtmlError::NotFound.default())?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    insert_recipe_tags(&mut tr, id, &changes.tags).await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    insert_recipe_parts(&mut tr, id, &changes.ingredients).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(recipe)
}

/// Join rows go with the recipe through `ON DELETE CASCADE`.
pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_author_recipes(
    author_id: Id,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, Error> {
    // LIMIT NULL is LIMIT ALL
    let rows: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC, id DESC LIMIT $2",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn count_author_recipes(author_id: Id, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

async fn insert_recipe_tags(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    tags: &[Id],
) -> Result<(), Error> {
    if tags.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

    query_builder.push_values(tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Fails with not-found on the first ingredient id missing from the catalog.
async fn insert_recipe_parts(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    parts: &[IngredientAmount],
) -> Result<(), Error> {
    if parts.is_empty() {
        return Ok(());
    }

    let ids: Vec<Id> = parts.iter().map(|part| part.id).collect();
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids.clone())
        .fetch_all(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    if let Some(missing) = ids.iter().find(|id| !found.iter().any(|(f,)| f == *id)) {
        return Err(HtmlError::NotFound.new(&format!("Ingredient {missing} does not exist.")));
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(parts.iter(), |mut b, part| {
        b.push_bind(recipe_id)
            .push_bind(part.id)
            .push_bind(part.amount);
    });

    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
