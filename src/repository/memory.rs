use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{
    EMAIL_TAKEN, NutritionRepository, RecipeRepository, StoreError, USERNAME_TAKEN,
    UserRepository,
};
use crate::models::{NutritionRecord, Recipe, RecipeIngredient, Session, User};
use crate::nutrition::{IngredientEntry, NutritionTable};
use crate::recipes::RecipeDraft;

#[derive(Default)]
struct State {
    users: Vec<User>,
    sessions: Vec<Session>,
    recipes: Vec<Recipe>,
    ingredients: Vec<RecipeIngredient>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local storage. Every operation holds one lock for its whole
/// duration, so multi-row writes are atomic.
#[derive(Default)]
pub struct MemoryRepository {
    products: NutritionTable,
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new(products: NutritionTable) -> Self {
        Self {
            products,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl NutritionRepository for MemoryRepository {
    fn find_by_name(&self, name: &str) -> Result<Option<NutritionRecord>, StoreError> {
        self.products.find_by_name(name)
    }

    fn list_product_names(&self) -> Result<Vec<String>, StoreError> {
        self.products.list_product_names()
    }
}

impl RecipeRepository for MemoryRepository {
    fn create_recipe(
        &self,
        owner_id: i32,
        draft: &RecipeDraft,
        ingredients: &[IngredientEntry],
    ) -> Result<(Recipe, Vec<RecipeIngredient>), StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();

        let recipe = Recipe {
            id: state.next_id(),
            user_id: owner_id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            prep_time: draft.prep_time,
            servings: draft.servings,
            cook_time: draft.cook_time,
            instructions: draft.instructions.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut stored = Vec::with_capacity(ingredients.len());
        for entry in ingredients {
            stored.push(RecipeIngredient {
                id: state.next_id(),
                recipe_id: recipe.id,
                product_name: entry.name.clone(),
                quantity: entry.quantity.clone(),
            });
        }

        state.recipes.push(recipe.clone());
        state.ingredients.extend(stored.iter().cloned());
        Ok((recipe, stored))
    }

    fn find_recipe(&self, id: i32) -> Result<Option<Recipe>, StoreError> {
        Ok(self.lock()?.recipes.iter().find(|r| r.id == id).cloned())
    }

    fn list_recipe_ingredients(
        &self,
        recipe_id: i32,
    ) -> Result<Vec<RecipeIngredient>, StoreError> {
        Ok(self
            .lock()?
            .ingredients
            .iter()
            .filter(|i| i.recipe_id == recipe_id)
            .cloned()
            .collect())
    }

    fn list_recipes_by_owner(&self, owner_id: i32) -> Result<Vec<Recipe>, StoreError> {
        Ok(self
            .lock()?
            .recipes
            .iter()
            .filter(|r| r.user_id == owner_id)
            .cloned()
            .collect())
    }

    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.lock()?.recipes.clone())
    }

    fn update_recipe(&self, id: i32, draft: &RecipeDraft) -> Result<Option<Recipe>, StoreError> {
        let mut state = self.lock()?;
        let Some(recipe) = state.recipes.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        recipe.name = draft.name.clone();
        recipe.description = draft.description.clone();
        recipe.prep_time = draft.prep_time;
        recipe.servings = draft.servings;
        recipe.cook_time = draft.cook_time;
        recipe.instructions = draft.instructions.clone();
        recipe.updated_at = Utc::now();
        Ok(Some(recipe.clone()))
    }

    fn delete_recipe(&self, id: i32) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let before = state.recipes.len();
        state.recipes.retain(|r| r.id != id);
        if state.recipes.len() == before {
            return Ok(false);
        }
        state.ingredients.retain(|i| i.recipe_id != id);
        Ok(true)
    }
}

impl UserRepository for MemoryRepository {
    fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Conflict(USERNAME_TAKEN.to_string()));
        }
        if state.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let user = User {
            id: state.next_id(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    fn create_session(
        &self,
        user_id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let session = Session {
            id: state.next_id(),
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        state.sessions.push(session);
        Ok(())
    }

    fn find_user_by_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let state = self.lock()?;
        let Some(session) = state
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash && s.expires_at > now)
        else {
            return Ok(None);
        };
        Ok(state.users.iter().find(|u| u.id == session.user_id).cloned())
    }

    fn delete_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let before = state.sessions.len();
        state.sessions.retain(|s| s.token_hash != token_hash);
        Ok(state.sessions.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::Product;
    use chrono::Duration;

    fn draft() -> RecipeDraft {
        RecipeDraft {
            name: "Pancakes".to_string(),
            description: "Cottage cheese pancakes".to_string(),
            prep_time: 5,
            servings: 2,
            cook_time: 10,
            instructions: "Whisk and fry.".to_string(),
        }
    }

    fn entry(name: &str, quantity: &str) -> IngredientEntry {
        IngredientEntry {
            name: name.to_string(),
            product: Product::Unresolved,
            quantity: quantity.to_string(),
        }
    }

    #[test]
    fn test_create_and_list_recipes() {
        let repo = MemoryRepository::default();
        let (recipe, stored) = repo
            .create_recipe(7, &draft(), &[entry("Egg", "2"), entry("Flour", "abc")])
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|i| i.recipe_id == recipe.id));
        assert_eq!(repo.list_recipe_ingredients(recipe.id).unwrap(), stored);
        assert_eq!(repo.list_recipes_by_owner(7).unwrap(), vec![recipe.clone()]);
        assert!(repo.list_recipes_by_owner(8).unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_ingredients() {
        let repo = MemoryRepository::default();
        let (recipe, _) = repo.create_recipe(1, &draft(), &[entry("Egg", "2")]).unwrap();

        assert!(repo.delete_recipe(recipe.id).unwrap());
        assert!(!repo.delete_recipe(recipe.id).unwrap());
        assert!(repo.list_recipe_ingredients(recipe.id).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_users_conflict() {
        let repo = MemoryRepository::default();
        repo.create_user("ann", "ann@example.com", "h").unwrap();

        let by_name = repo.create_user("ann", "other@example.com", "h").unwrap_err();
        assert_eq!(by_name.to_string(), USERNAME_TAKEN);

        let by_email = repo.create_user("bob", "ann@example.com", "h").unwrap_err();
        assert_eq!(by_email.to_string(), EMAIL_TAKEN);
    }

    #[test]
    fn test_expired_sessions_do_not_resolve() {
        let repo = MemoryRepository::default();
        let user = repo.create_user("ann", "ann@example.com", "h").unwrap();
        let now = Utc::now();
        repo.create_session(user.id, "live", now + Duration::hours(1)).unwrap();
        repo.create_session(user.id, "stale", now - Duration::hours(1)).unwrap();

        assert_eq!(repo.find_user_by_session("live", now).unwrap(), Some(user));
        assert_eq!(repo.find_user_by_session("stale", now).unwrap(), None);
        assert!(repo.delete_session("live").unwrap());
        assert_eq!(repo.find_user_by_session("live", now).unwrap(), None);
    }
}
