use std::collections::HashMap;

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::config::Config;
use crate::db::blocking;
use crate::error::AppError;
use crate::form;
use crate::models::Recipe;
use crate::recipes::{self, RecipeDraft, RecipeSubmission};
use crate::repository::Repository;

#[derive(Serialize)]
pub struct RecipesResponse {
    pub recipes: Vec<Recipe>,
}

#[derive(Serialize)]
pub struct RecipeResponse {
    pub recipe: Recipe,
}

#[post("/api/recipes")]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    repo: web::Data<dyn Repository>,
    config: web::Data<Config>,
    body: web::Json<RecipeSubmission>,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();
    let max_slots = config.max_ingredient_slots;
    let RecipeSubmission { draft, ingredients } = body.into_inner();

    let created = blocking(move || {
        recipes::create_recipe(&*repo, &user, &draft, &ingredients, max_slots)
    })
    .await?;

    Ok(HttpResponse::Created().json(created))
}

/// Accepts the browser form layout: recipe fields plus indexed
/// `list_of_products_{i}` / `quantities_{i}` pairs.
#[post("/addrecipe")]
pub async fn create_recipe_form(
    AuthUser(user): AuthUser,
    repo: web::Data<dyn Repository>,
    config: web::Data<Config>,
    fields: web::Form<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();
    let max_slots = config.max_ingredient_slots;
    let fields = fields.into_inner();

    let draft = form::draft_from_fields(&fields)?;
    let slots = form::slots_from_fields(&fields, max_slots);

    let created = blocking(move || {
        recipes::create_recipe(&*repo, &user, &draft, &slots, max_slots)
    })
    .await?;

    Ok(HttpResponse::Created().json(created))
}

#[get("/api/recipes/{id}")]
pub async fn get_recipe(
    AuthUser(_user): AuthUser,
    repo: web::Data<dyn Repository>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();
    let id = path.into_inner();

    let detail = blocking(move || recipes::recipe_detail(&*repo, id)).await?;

    Ok(HttpResponse::Ok().json(detail))
}

#[get("/api/recipes")]
pub async fn list_recipes(repo: web::Data<dyn Repository>) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();

    let recipes = blocking(move || Ok(repo.list_recipes()?)).await?;

    Ok(HttpResponse::Ok().json(RecipesResponse { recipes }))
}

#[get("/api/my_recipes")]
pub async fn my_recipes(
    AuthUser(user): AuthUser,
    repo: web::Data<dyn Repository>,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();

    let recipes = blocking(move || Ok(repo.list_recipes_by_owner(user.id)?)).await?;

    Ok(HttpResponse::Ok().json(RecipesResponse { recipes }))
}

#[put("/api/recipes/{id}")]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    repo: web::Data<dyn Repository>,
    path: web::Path<i32>,
    body: web::Json<RecipeDraft>,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();
    let id = path.into_inner();
    let draft = body.into_inner();

    let recipe = blocking(move || recipes::update_recipe(&*repo, &user, id, &draft)).await?;

    Ok(HttpResponse::Ok().json(RecipeResponse { recipe }))
}

#[delete("/api/recipes/{id}")]
pub async fn delete_recipe(
    AuthUser(user): AuthUser,
    repo: web::Data<dyn Repository>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();
    let id = path.into_inner();

    blocking(move || recipes::delete_recipe(&*repo, &user, id)).await?;

    Ok(HttpResponse::NoContent().finish())
}
