mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod views {
    pub mod catalog;
    pub mod collections;
    pub mod recipes;
    pub mod serializers;
    pub mod subscriptions;
    pub mod users;
}

pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod media;
pub mod routes;
pub mod shopping_list;
pub mod state;
pub mod validators;

pub use authentication::*;
pub use database::*;
