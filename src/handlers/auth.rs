use actix_web::{HttpResponse, post, web};
use serde::Serialize;

use crate::auth::{self, BearerToken, LoginRequest, RegisterRequest};
use crate::config::Config;
use crate::db::blocking;
use crate::error::AppError;
use crate::repository::Repository;

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user_id: i32,
    pub username: String,
}

#[post("/api/auth/register")]
pub async fn register(
    repo: web::Data<dyn Repository>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();
    let req = body.into_inner();

    let user = blocking(move || auth::register(&*repo, &req)).await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        user_id: user.id,
        username: user.username,
    }))
}

#[post("/api/auth/login")]
pub async fn login(
    repo: web::Data<dyn Repository>,
    config: web::Data<Config>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();
    let req = body.into_inner();
    let policy = config.session_policy;

    let session = blocking(move || auth::login(&*repo, &req, policy)).await?;

    Ok(HttpResponse::Ok().json(session))
}

#[post("/api/auth/logout")]
pub async fn logout(
    repo: web::Data<dyn Repository>,
    BearerToken(token): BearerToken,
) -> Result<HttpResponse, AppError> {
    let repo = repo.into_inner();

    blocking(move || auth::logout(&*repo, &token)).await?;

    Ok(HttpResponse::NoContent().finish())
}
