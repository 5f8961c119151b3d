/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `user`: registration, token issue and own profile
/// - `attributes`: tags and ingredients
/// - `recipes`: recipe CRUD
/// - `images`: recipe image upload

pub mod attributes;
pub mod health;
pub mod images;
pub mod recipes;
pub mod user;
