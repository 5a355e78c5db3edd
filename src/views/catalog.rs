use crate::{
    constants::DEFAULT_TAGS,
    error::{Error, HtmlError},
    form::QueryParams,
    schema::{Id, Ingredient, NewIngredient, NewTag, Tag},
    store::Store,
    validators::{validate_color, validate_slug},
};

pub async fn list_tags(store: &dyn Store) -> Result<Vec<Tag>, Error> {
    store.list_tags().await
}

pub async fn get_tag(store: &dyn Store, id: Id) -> Result<Tag, Error> {
    store
        .get_tag(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())
}

/// Case-insensitive prefix search on `?name=`, everything when absent.
pub async fn search_ingredients(
    store: &dyn Store,
    query: &QueryParams,
) -> Result<Vec<Ingredient>, Error> {
    let prefix = query.get_str("name").filter(|name| !name.is_empty());
    store.search_ingredients(prefix).await
}

pub async fn get_ingredient(store: &dyn Store, id: Id) -> Result<Ingredient, Error> {
    store
        .get_ingredient(id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())
}

/// Inserts the default tags and returns how many were new.
pub async fn load_tags(store: &dyn Store) -> Result<usize, Error> {
    let mut created = 0;

    for (name, color, slug) in DEFAULT_TAGS {
        validate_color(color).map_err(|e| HtmlError::InvalidRequest.new(e))?;
        validate_slug(slug).map_err(|e| HtmlError::InvalidRequest.new(e))?;

        let tag = NewTag {
            name: name.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        };
        match store.create_tag(tag).await? {
            Some(tag) => {
                log::info!("Loaded tag {}", tag.slug);
                created += 1;
            }
            None => log::debug!("Tag {slug} already present"),
        }
    }

    Ok(created)
}

/// Parses a JSON array of `{ "name", "measurement_unit" }` objects.
pub fn parse_ingredients(json: &str) -> Result<Vec<NewIngredient>, Error> {
    serde_json::from_str(json)
        .map_err(|e| HtmlError::InvalidRequest.new(&format!("Invalid ingredient file: {e}")))
}

/// Inserts the ingredients and returns how many were new.
pub async fn load_ingredients(
    store: &dyn Store,
    ingredients: Vec<NewIngredient>,
) -> Result<usize, Error> {
    let mut created = 0;

    for ingredient in ingredients {
        if store.create_ingredient(ingredient).await?.is_some() {
            created += 1;
        }
    }

    log::info!("Loaded {created} new ingredients");
    Ok(created)
}
