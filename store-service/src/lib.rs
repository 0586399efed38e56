pub mod api;
pub mod auth;
pub mod fixtures;
pub mod models;
pub mod schema;
pub mod store;

use diesel_migrations::{embed_migrations, EmbeddedMigrations};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
