use actix_web::{Error, HttpRequest, web};

use crate::error::AppError;

pub mod auth;
pub mod health;
pub mod nutrition;
pub mod recipes;

/// Registers every endpoint. Callers provide `web::Data<dyn Repository>` and
/// `web::Data<Config>` as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(bad_request))
        .app_data(web::FormConfig::default().error_handler(bad_request))
        .app_data(web::PathConfig::default().error_handler(bad_request));

    cfg.service(health::health)
        .service(auth::register)
        .service(auth::login)
        .service(auth::logout)
        .service(nutrition::list_products)
        .service(nutrition::preview)
        .service(recipes::create_recipe)
        .service(recipes::create_recipe_form)
        .service(recipes::list_recipes)
        .service(recipes::my_recipes)
        .service(recipes::get_recipe)
        .service(recipes::update_recipe)
        .service(recipes::delete_recipe);
}

/// Extractor failures use the same JSON error body as every other error.
fn bad_request<E: std::fmt::Display>(err: E, req: &HttpRequest) -> Error {
    log::debug!("Rejected request to {}: {}", req.path(), err);
    AppError::BadRequest(err.to_string()).into()
}
