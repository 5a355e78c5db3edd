use std::str::FromStr;

use crate::database::error::TypeError;

/// Decoded query string. Keys may repeat (`?tags=a&tags=b`).
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    inner: Vec<(String, String)>,
}

impl QueryParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { inner: pairs }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.inner
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some("") | None => Ok(None),
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid value for '{key}'"))),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, TypeError> {
        match self.get_str(key) {
            Some("") | None => Ok(None),
            Some(value) => match value.to_lowercase().as_str() {
                "1" | "true" => Ok(Some(true)),
                "0" | "false" => Ok(Some(false)),
                _ => Err(TypeError::new(&format!("Invalid value for '{key}'"))),
            },
        }
    }
}
