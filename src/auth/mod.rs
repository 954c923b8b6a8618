mod crypto;
mod extractor;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub use crypto::{generate_token, hash_password, hash_token, verify_password};
pub use extractor::{AuthUser, BearerToken};

use crate::error::{AppError, FieldError};
use crate::models::User;
use crate::repository::{EMAIL_TAKEN, Repository, StoreError, USERNAME_TAKEN};

const MAX_USERNAME_LEN: usize = 20;
const MAX_EMAIL_LEN: usize = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// How long a new session stays valid.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub ttl: Duration,
    pub remember_me_ttl: Duration,
}

impl SessionPolicy {
    fn ttl_for(&self, remember: bool) -> Duration {
        if remember { self.remember_me_ttl } else { self.ttl }
    }
}

fn looks_like_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();

        if self.username.trim().is_empty() {
            errors.push(FieldError::new("username", "This field is required."));
        } else if self.username.chars().count() > MAX_USERNAME_LEN {
            errors.push(FieldError::new(
                "username",
                format!("Must be at most {} characters long.", MAX_USERNAME_LEN),
            ));
        }

        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "This field is required."));
        } else if self.email.len() > MAX_EMAIL_LEN || !looks_like_email(&self.email) {
            errors.push(FieldError::new("email", "Invalid email address."));
        }

        if self.password.is_empty() {
            errors.push(FieldError::new("password", "This field is required."));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Creates an account. Registration does not start a session.
pub fn register(repo: &dyn Repository, req: &RegisterRequest) -> Result<User, AppError> {
    req.validate()?;

    if repo.find_user_by_email(&req.email)?.is_some() {
        return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()).into());
    }
    if repo.find_user_by_username(&req.username)?.is_some() {
        return Err(StoreError::Conflict(USERNAME_TAKEN.to_string()).into());
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| AppError::PasswordHash(e.to_string()))?;
    let user = repo.create_user(&req.username, &req.email, &password_hash)?;

    log::info!("Registered user {} ({})", user.id, user.username);
    Ok(user)
}

pub fn login(
    repo: &dyn Repository,
    req: &LoginRequest,
    policy: SessionPolicy,
) -> Result<LoginResponse, AppError> {
    let user = repo
        .find_user_by_email(&req.email)?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        log::info!("Failed login for user {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    let expires_at = Utc::now()
        .checked_add_signed(policy.ttl_for(req.remember))
        .ok_or(AppError::Misconfigured("session lifetime out of range"))?;
    let token = generate_token();
    repo.create_session(user.id, &hash_token(&token), expires_at)?;

    log::info!("User {} logged in", user.id);
    Ok(LoginResponse { token, expires_at })
}

pub fn logout(repo: &dyn Repository, token: &str) -> Result<(), AppError> {
    repo.delete_session(&hash_token(token))?;
    Ok(())
}
