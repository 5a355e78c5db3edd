pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_USER_FIELD_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_COLOR_LENGTH: usize = 7;

pub const MIN_COOKING_TIME: i64 = 1;
pub const MIN_INGREDIENT_AMOUNT: i64 = 1;
pub const MAX_SMALL_INTEGER: i64 = 32767;

/// Upper bound for JSON request bodies, images arrive base64-encoded inside them.
pub const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.pdf";

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// (name, color, slug)
pub const DEFAULT_TAGS: &[(&str, &str, &str)] = &[
    ("Breakfast", "#FFA07A", "breakfast"),
    ("Lunch", "#90EE90", "lunch"),
    ("Dinner", "#87CEFA", "dinner"),
];
