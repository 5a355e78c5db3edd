use serde::{Deserialize, Serialize};

use crate::{
    constants::{MAX_PAGE_SIZE, RECIPE_COUNT_PER_PAGE},
    database::error::TypeError,
    error::{Error, HtmlError},
    form::QueryParams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: RECIPE_COUNT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Reads `page` and `limit` from the query string.
    pub fn from_query(query: &QueryParams) -> Result<Self, TypeError> {
        let page = query.get_number::<i64>("page")?.unwrap_or(1);
        let limit = query
            .get_number::<i64>("limit")?
            .unwrap_or(RECIPE_COUNT_PER_PAGE);

        if page < 1 {
            return Err(TypeError::new("Invalid page."));
        }
        if limit < 1 {
            return Err(TypeError::new("Invalid limit."));
        }

        let request = Self::new(page, limit);
        if (request.page - 1).checked_mul(request.limit).is_none() {
            return Err(TypeError::new("Invalid page."));
        }

        Ok(request)
    }

    /// Saturates instead of wrapping, so an absurd page lands past the end.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    /// Pages past the end are rejected, an empty first page is not.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Result<Self, Error> {
        if rows.is_empty() && request.page > 1 {
            return Err(HtmlError::NotFound.new("Invalid page."));
        }

        let next = if request.offset() + (rows.len() as i64) < total_rows {
            Some(page_link(request.page + 1, request.limit))
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(page_link(request.page - 1, request.limit))
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }
}

fn page_link(page: i64, limit: i64) -> String {
    format!("?page={page}&limit={limit}")
}
