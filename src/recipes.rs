use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldError};
use crate::models::{Recipe, RecipeIngredient, User};
use crate::nutrition::{self, Aggregation, IngredientSlot, NutritionTotal, QuantityWarning};
use crate::repository::Repository;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_INSTRUCTIONS_LEN: usize = 1000;

const REQUIRED: &str = "This field is required.";

/// The editable part of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    pub description: String,
    pub prep_time: i32,
    pub servings: i32,
    pub cook_time: i32,
    pub instructions: String,
}

impl RecipeDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();

        check_text(&mut errors, "name", &self.name, MAX_NAME_LEN);
        check_text(&mut errors, "description", &self.description, MAX_DESCRIPTION_LEN);
        check_text(&mut errors, "instructions", &self.instructions, MAX_INSTRUCTIONS_LEN);
        check_positive(&mut errors, "prep_time", self.prep_time);
        check_positive(&mut errors, "servings", self.servings);
        check_positive(&mut errors, "cook_time", self.cook_time);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

fn check_text(errors: &mut Vec<FieldError>, field: &'static str, value: &str, max_len: usize) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, REQUIRED));
    } else if value.chars().count() > max_len {
        errors.push(FieldError::new(
            field,
            format!("Must be at most {} characters long.", max_len),
        ));
    }
}

fn check_positive(errors: &mut Vec<FieldError>, field: &'static str, value: i32) {
    if value < 1 {
        errors.push(FieldError::new(field, "Must be at least 1."));
    }
}

/// A recipe submission: the draft plus its ingredient slots.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeSubmission {
    #[serde(flatten)]
    pub draft: RecipeDraft,
    #[serde(default)]
    pub ingredients: Vec<IngredientSlot>,
}

#[derive(Debug, Serialize)]
pub struct CreatedRecipe {
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredient>,
    pub total_nutrition: NutritionTotal,
    pub warnings: Vec<QuantityWarning>,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredient>,
    pub total_nutrition: NutritionTotal,
}

/// Validates the draft, aggregates the slots and stores everything in one
/// transaction.
///
/// Every accepted entry is stored under its submitted name, including
/// entries whose quantity did not parse or whose product is unknown. Those
/// entries contribute nothing to the returned total.
pub fn create_recipe(
    repo: &dyn Repository,
    owner: &User,
    draft: &RecipeDraft,
    slots: &[IngredientSlot],
    max_slots: usize,
) -> Result<CreatedRecipe, AppError> {
    draft.validate()?;

    let Aggregation {
        ingredients,
        total,
        warnings,
    } = nutrition::aggregate(slots, max_slots, repo)?;

    let (recipe, stored) = repo.create_recipe(owner.id, draft, &ingredients)?;
    log::info!(
        "User {} created recipe {} with {} ingredients",
        owner.id,
        recipe.id,
        stored.len()
    );

    Ok(CreatedRecipe {
        recipe,
        ingredients: stored,
        total_nutrition: total,
        warnings,
    })
}

pub fn preview(
    repo: &dyn Repository,
    slots: &[IngredientSlot],
    max_slots: usize,
) -> Result<Aggregation, AppError> {
    Ok(nutrition::aggregate(slots, max_slots, repo)?)
}

/// A stored recipe with its ingredients and a total recomputed from them.
pub fn recipe_detail(repo: &dyn Repository, id: i32) -> Result<RecipeDetail, AppError> {
    let recipe = repo
        .find_recipe(id)?
        .ok_or(AppError::NotFound("Recipe not found"))?;
    let ingredients = repo.list_recipe_ingredients(recipe.id)?;

    let total = nutrition::stored_total(
        ingredients
            .iter()
            .map(|i| (i.product_name.as_str(), i.quantity.as_str())),
        repo,
    )?;

    Ok(RecipeDetail {
        recipe,
        ingredients,
        total_nutrition: total,
    })
}

fn owned_recipe(
    repo: &dyn Repository,
    user: &User,
    id: i32,
    denied: &'static str,
) -> Result<Recipe, AppError> {
    let recipe = repo
        .find_recipe(id)?
        .ok_or(AppError::NotFound("Recipe not found"))?;
    if recipe.user_id != user.id {
        log::warn!("User {} denied access to recipe {}", user.id, id);
        return Err(AppError::Forbidden(denied));
    }
    Ok(recipe)
}

/// Updates the scalar fields of a recipe the user owns. Ingredients are left
/// as they are.
pub fn update_recipe(
    repo: &dyn Repository,
    user: &User,
    id: i32,
    draft: &RecipeDraft,
) -> Result<Recipe, AppError> {
    owned_recipe(repo, user, id, "You do not have permission to edit this recipe.")?;
    draft.validate()?;

    repo.update_recipe(id, draft)?
        .ok_or(AppError::NotFound("Recipe not found"))
}

pub fn delete_recipe(repo: &dyn Repository, user: &User, id: i32) -> Result<(), AppError> {
    owned_recipe(repo, user, id, "You do not have permission to delete this recipe.")?;

    if !repo.delete_recipe(id)? {
        return Err(AppError::NotFound("Recipe not found"));
    }
    log::info!("User {} deleted recipe {}", user.id, id);
    Ok(())
}
