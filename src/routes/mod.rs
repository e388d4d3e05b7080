use actix_web::http::StatusCode;
use actix_web::{get, web, HttpResponse, ResponseError};
use serde_json::json;

use crate::errors::{ArticleError, AuthenticationError, StorageError, UserError};

pub mod articles;
pub mod auth;
pub mod users;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Article(#[from] ArticleError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error("Authentication error {0:?}")]
    Authentication(#[from] AuthenticationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Passwords does not match")]
    PasswordMismatch,
    #[error("Account creation is disabled")]
    AccountCreationDisabled,
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,
}

/// Problem style JSON body
pub fn problem(
    status: StatusCode,
    kind: &str,
    title: &str,
    detail: impl Into<String>,
) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "type": format!("/problem/{kind}"),
        "title": title,
        "status": status.as_u16(),
        "detail": detail.into(),
    }))
}

fn storage_problem(error: &StorageError) -> HttpResponse {
    match error {
        StorageError::Contended => problem(
            StatusCode::SERVICE_UNAVAILABLE,
            "contended",
            "Too many concurrent updates",
            "The operation can be retried",
        ),
        StorageError::Duplicate => problem(
            StatusCode::CONFLICT,
            "conflict",
            "Conflicting data",
            "Object already exists",
        ),
        other => {
            tracing::error!("Storage error: {}", other);
            problem(
                StatusCode::INTERNAL_SERVER_ERROR,
                "database",
                "Error with the database",
                "Unexpected error with the database",
            )
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Article(error) => match error {
                ArticleError::NotFound | ArticleError::AuthorNotFound => StatusCode::NOT_FOUND,
                ArticleError::AlreadyReacted(_) => StatusCode::CONFLICT,
                ArticleError::Forbidden => StatusCode::FORBIDDEN,
                ArticleError::Validation(_) => StatusCode::BAD_REQUEST,
                ArticleError::Storage(StorageError::Contended) => StatusCode::SERVICE_UNAVAILABLE,
                ArticleError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::User(error) => match error {
                UserError::AccountExists => StatusCode::CONFLICT,
                UserError::AccountNotFound => StatusCode::NOT_FOUND,
                UserError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                UserError::InvalidPassword | UserError::Validation(_) => StatusCode::BAD_REQUEST,
                UserError::Hashing(_) | UserError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Authentication(error) => error.status_code(),
            ApiError::Storage(StorageError::Contended) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Storage(StorageError::Duplicate) => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PasswordMismatch => StatusCode::BAD_REQUEST,
            ApiError::AccountCreationDisabled => StatusCode::FORBIDDEN,
            ApiError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        match self {
            ApiError::Authentication(error) => error.error_response(),
            ApiError::Storage(error)
            | ApiError::Article(ArticleError::Storage(error))
            | ApiError::User(UserError::Storage(error)) => storage_problem(error),
            ApiError::Article(ArticleError::NotFound) => {
                problem(status, "not-found", "Object not found", "Article not found")
            }
            ApiError::Article(ArticleError::AuthorNotFound) => {
                problem(status, "not-found", "Object not found", "Author not found")
            }
            ApiError::Article(error @ ArticleError::AlreadyReacted(_)) => {
                problem(status, "already-reacted", "Reaction already recorded", error.to_string())
            }
            ApiError::Article(error @ ArticleError::Forbidden) => {
                problem(status, "forbidden", "Forbidden", error.to_string())
            }
            ApiError::Article(ArticleError::Validation(reason))
            | ApiError::User(UserError::Validation(reason)) => {
                problem(status, "validation", "Invalid request", reason.clone())
            }
            ApiError::User(UserError::Hashing(reason)) => {
                tracing::error!("Password hashing failed: {}", reason);
                problem(status, "internal", "Internal error", "Unexpected error")
            }
            ApiError::User(error @ UserError::AccountExists) => {
                problem(status, "account-exists", "Account already exists", error.to_string())
            }
            ApiError::User(error @ UserError::AccountNotFound) => {
                problem(status, "not-found", "Object not found", error.to_string())
            }
            ApiError::User(error @ UserError::InvalidCredentials) => {
                problem(status, "invalid-credentials", "Invalid credentials", error.to_string())
            }
            ApiError::User(error @ UserError::InvalidPassword) => {
                problem(status, "invalid-password", "Invalid password", error.to_string())
            }
            ApiError::PasswordMismatch => problem(
                status,
                "password-mismatch",
                "Passwords does not match",
                "New password and its confirmation differ",
            ),
            ApiError::AccountCreationDisabled => problem(
                status,
                "account-creation-disabled",
                "Account creation is disabled",
                self.to_string(),
            ),
            ApiError::InvalidRefreshToken => {
                problem(status, "authentication", "Authentication failed", self.to_string())
            }
        }
    }
}

#[get("/api/v1/ping")]
#[tracing::instrument]
pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("pong")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(auth::configure)
        .configure(users::configure)
        .configure(articles::configure);
}
