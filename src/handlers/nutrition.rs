use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::blocking;
use crate::error::AppError;
use crate::nutrition::{IngredientEntry, IngredientSlot, NutritionTotal, QuantityWarning};
use crate::recipes;
use crate::repository::Repository;

#[derive(Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub ingredients: Vec<IngredientSlot>,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub ingredients: Vec<IngredientEntry>,
    pub total_nutrition: NutritionTotal,
    pub warnings: Vec<QuantityWarning>,
}

#[get("/api/products")]
pub async fn list_products(repo: web::Data<dyn Repository>) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();

    let names = blocking(move || Ok(repo.list_product_names()?)).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "products": names })))
}

/// Totals for an ingredient list without saving anything.
#[post("/api/nutrition/preview")]
pub async fn preview(
    repo: web::Data<dyn Repository>,
    config: web::Data<Config>,
    body: web::Json<PreviewRequest>,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();
    let max_slots = config.max_ingredient_slots;
    let slots = body.into_inner().ingredients;

    let aggregation = blocking(move || recipes::preview(&*repo, &slots, max_slots)).await?;

    Ok(HttpResponse::Ok().json(PreviewResponse {
        ingredients: aggregation.ingredients,
        total_nutrition: aggregation.total,
        warnings: aggregation.warnings,
    }))
}
