use sqlx::{Pool, Postgres};

use crate::{
    database::error::QueryError,
    error::Error,
    schema::{Id, Ingredient, NewIngredient},
};

pub async fn search_ingredients(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match prefix {
        Some(prefix) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE starts_with(LOWER(name), LOWER($1)) ORDER BY name, id",
        )
        .bind(prefix)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn create_ingredient(
    ingredient: &NewIngredient,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(&ingredient.name)
    .bind(&ingredient.measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}
