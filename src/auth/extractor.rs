use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;

use super::crypto::hash_token;
use crate::db::blocking;
use crate::error::AppError;
use crate::models::User;
use crate::repository::Repository;

/// Extractor that validates the `Authorization: Bearer` header and provides
/// the authenticated user.
///
/// ```ignore
/// async fn my_handler(AuthUser(user): AuthUser) -> impl Responder {
///     // user is the authenticated User
/// }
/// ```
pub struct AuthUser(pub User);

/// The raw bearer token of the current request, for logout.
pub struct BearerToken(pub String);

fn bearer_token(req: &HttpRequest) -> Result<String, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header"))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or(AppError::Unauthorized("Invalid Authorization header format"))
}

impl FromRequest for BearerToken {
    type Error = AppError;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        std::future::ready(bearer_token(req).map(BearerToken))
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let repo = req.app_data::<web::Data<dyn Repository>>().cloned();

        Box::pin(async move {
            let token = token?;
            let repo = repo
                .ok_or(AppError::Misconfigured("repository not registered"))?
                .into_inner();
            let token_hash = hash_token(&token);

            let user = blocking(move || {
                Ok(repo.find_user_by_session(&token_hash, Utc::now())?)
            })
            .await?;

            user.map(AuthUser)
                .ok_or(AppError::Unauthorized("Invalid or expired token"))
        })
    }
}
