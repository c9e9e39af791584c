// Course Review - Core Library
// Exposes the store, aggregator and HTTP handlers for the server binary and tests

pub mod config;
pub mod db;
pub mod error;
pub mod flash;
pub mod rating;
pub mod routes;
pub mod views;

// Re-export commonly used types
pub use config::{Config, ConfigError, LoggingConfig};
pub use db::{
    Course, Review, InsertOutcome,
    open_database, setup_database,
    insert_course, get_course, get_all_courses, search_courses, delete_course,
    insert_review, get_review, get_reviews_for_course, delete_review,
};
pub use error::AppError;
pub use flash::{FlashKey, FlashMessage, Flashes};
pub use routes::{router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
