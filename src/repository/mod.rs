//! Storage boundary.
//!
//! Handlers never talk to diesel directly; they receive a
//! `web::Data<dyn Repository>` and go through these narrow traits. The
//! PostgreSQL implementation backs production, the in-memory one backs tests
//! and `STORAGE=memory` runs.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{NutritionRecord, Recipe, RecipeIngredient, User};
use crate::nutrition::IngredientEntry;
use crate::recipes::RecipeDraft;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("{0}")]
    Conflict(String),

    #[error("In-memory store lock poisoned")]
    Poisoned,
}

pub trait NutritionRepository: Send + Sync {
    /// Exact-name lookup. When several categories share a name the record
    /// with the lowest id is returned.
    fn find_by_name(&self, name: &str) -> Result<Option<NutritionRecord>, StoreError>;

    /// Distinct product names, sorted, for ingredient pickers.
    fn list_product_names(&self) -> Result<Vec<String>, StoreError>;
}

pub trait RecipeRepository: Send + Sync {
    /// Creates the recipe and one ingredient row per entry atomically.
    fn create_recipe(
        &self,
        owner_id: i32,
        draft: &RecipeDraft,
        ingredients: &[IngredientEntry],
    ) -> Result<(Recipe, Vec<RecipeIngredient>), StoreError>;

    fn find_recipe(&self, id: i32) -> Result<Option<Recipe>, StoreError>;

    fn list_recipe_ingredients(&self, recipe_id: i32)
        -> Result<Vec<RecipeIngredient>, StoreError>;

    fn list_recipes_by_owner(&self, owner_id: i32) -> Result<Vec<Recipe>, StoreError>;

    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError>;

    fn update_recipe(&self, id: i32, draft: &RecipeDraft) -> Result<Option<Recipe>, StoreError>;

    /// Removes the recipe together with its ingredients. Returns whether a
    /// recipe was removed.
    fn delete_recipe(&self, id: i32) -> Result<bool, StoreError>;
}

pub trait UserRepository: Send + Sync {
    /// Fails with `StoreError::Conflict` when the username or email is taken.
    fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    fn create_session(
        &self,
        user_id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// The owner of an unexpired session, if any.
    fn find_user_by_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    fn delete_session(&self, token_hash: &str) -> Result<bool, StoreError>;
}

pub trait Repository: NutritionRepository + RecipeRepository + UserRepository {}

impl<T> Repository for T where T: NutritionRepository + RecipeRepository + UserRepository {}

pub const EMAIL_TAKEN: &str = "This email is already in use";
pub const USERNAME_TAKEN: &str = "This name is already in use";
