use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::MAX_COLOR_LENGTH;

static USERNAME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").ok());
static COLOR: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^#?[-a-zA-Z0-9_]+$").ok());

fn matches(pattern: &Lazy<Option<Regex>>, value: &str) -> bool {
    match pattern.as_ref() {
        Some(regex) => regex.is_match(value),
        None => {
            log::error!("Validator pattern failed to compile, rejecting {value:?}");
            false
        }
    }
}

/// Letters, digits and `.@+-_`, and never the reserved `me`.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.eq_ignore_ascii_case("me") {
        return Err("Username 'me' is not allowed.");
    }
    if !matches(&USERNAME, username) {
        return Err("Enter a valid username. It may contain only letters, digits and @/./+/-/_ characters.");
    }
    Ok(())
}

/// Slugs share the username alphabet.
pub fn validate_slug(slug: &str) -> Result<(), &'static str> {
    if !matches(&USERNAME, slug) {
        return Err("Enter a valid slug.");
    }
    Ok(())
}

pub fn validate_color(color: &str) -> Result<(), &'static str> {
    if color.chars().count() > MAX_COLOR_LENGTH || !matches(&COLOR, color) {
        return Err("Enter a valid HEX color.");
    }
    Ok(())
}
