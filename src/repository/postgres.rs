use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::{
    EMAIL_TAKEN, NutritionRepository, RecipeRepository, StoreError, USERNAME_TAKEN,
    UserRepository,
};
use crate::db::DbPool;
use crate::models::{
    NewRecipe, NewRecipeIngredient, NewSession, NewUser, NutritionRecord, Recipe,
    RecipeChanges, RecipeIngredient, User,
};
use crate::nutrition::IngredientEntry;
use crate::recipes::RecipeDraft;
use crate::schema::{products_nutritions, recipe_ingredients, recipes, sessions, users};

pub struct PgRepository {
    pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl NutritionRepository for PgRepository {
    fn find_by_name(&self, name: &str) -> Result<Option<NutritionRecord>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(products_nutritions::table
            .filter(products_nutritions::name.eq(name))
            .order(products_nutritions::id.asc())
            .select(NutritionRecord::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn list_product_names(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(products_nutritions::table
            .select(products_nutritions::name)
            .distinct()
            .order(products_nutritions::name.asc())
            .load(&mut conn)?)
    }
}

impl RecipeRepository for PgRepository {
    fn create_recipe(
        &self,
        owner_id: i32,
        draft: &RecipeDraft,
        ingredients: &[IngredientEntry],
    ) -> Result<(Recipe, Vec<RecipeIngredient>), StoreError> {
        let mut conn = self.pool.get()?;

        let created = conn.transaction::<_, DieselError, _>(|conn| {
            let recipe: Recipe = diesel::insert_into(recipes::table)
                .values(&NewRecipe {
                    user_id: owner_id,
                    name: &draft.name,
                    description: &draft.description,
                    prep_time: draft.prep_time,
                    servings: draft.servings,
                    cook_time: draft.cook_time,
                    instructions: &draft.instructions,
                })
                .returning(Recipe::as_returning())
                .get_result(conn)?;

            let rows: Vec<NewRecipeIngredient> = ingredients
                .iter()
                .map(|entry| NewRecipeIngredient {
                    recipe_id: recipe.id,
                    product_name: &entry.name,
                    quantity: &entry.quantity,
                })
                .collect();

            let stored: Vec<RecipeIngredient> = if rows.is_empty() {
                Vec::new()
            } else {
                diesel::insert_into(recipe_ingredients::table)
                    .values(&rows)
                    .returning(RecipeIngredient::as_returning())
                    .get_results(conn)?
            };

            Ok((recipe, stored))
        })?;

        Ok(created)
    }

    fn find_recipe(&self, id: i32) -> Result<Option<Recipe>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(recipes::table
            .find(id)
            .select(Recipe::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn list_recipe_ingredients(
        &self,
        recipe_id: i32,
    ) -> Result<Vec<RecipeIngredient>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(recipe_ingredients::table
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .order(recipe_ingredients::id.asc())
            .select(RecipeIngredient::as_select())
            .load(&mut conn)?)
    }

    fn list_recipes_by_owner(&self, owner_id: i32) -> Result<Vec<Recipe>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(recipes::table
            .filter(recipes::user_id.eq(owner_id))
            .order(recipes::id.asc())
            .select(Recipe::as_select())
            .load(&mut conn)?)
    }

    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(recipes::table
            .order(recipes::id.asc())
            .select(Recipe::as_select())
            .load(&mut conn)?)
    }

    fn update_recipe(&self, id: i32, draft: &RecipeDraft) -> Result<Option<Recipe>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::update(recipes::table.find(id))
            .set(&RecipeChanges {
                name: &draft.name,
                description: &draft.description,
                prep_time: draft.prep_time,
                servings: draft.servings,
                cook_time: draft.cook_time,
                instructions: &draft.instructions,
                updated_at: Utc::now(),
            })
            .returning(Recipe::as_returning())
            .get_result(&mut conn)
            .optional()?)
    }

    fn delete_recipe(&self, id: i32) -> Result<bool, StoreError> {
        let mut conn = self.pool.get()?;

        // recipe_ingredients rows go with it via ON DELETE CASCADE.
        let deleted = diesel::delete(recipes::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

impl UserRepository for PgRepository {
    fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut conn = self.pool.get()?;

        let new_user = NewUser {
            username,
            email,
            password_hash,
        };

        match diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)
        {
            Ok(user) => Ok(user),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                let message = match info.constraint_name() {
                    Some(constraint) if constraint.contains("email") => EMAIL_TAKEN,
                    _ => USERNAME_TAKEN,
                };
                Err(StoreError::Conflict(message.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn create_session(
        &self,
        user_id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(sessions::table)
            .values(&NewSession {
                user_id,
                token_hash,
                expires_at,
            })
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_user_by_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get()?;

        Ok(sessions::table
            .inner_join(users::table)
            .filter(sessions::token_hash.eq(token_hash))
            .filter(sessions::expires_at.gt(now))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn delete_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(sessions::table.filter(sessions::token_hash.eq(token_hash)))
            .execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
