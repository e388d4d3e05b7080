use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::model::article::Reaction;

/// Failure of one of the storage backends (postgres, redis, or the in-memory stores)
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Redis pool error: {0}")]
    RedisPool(#[from] deadpool_redis::PoolError),
    #[error("Unique constraint violated")]
    Duplicate,
    #[error("Too many concurrent updates, retry the operation")]
    Contended,
}

#[derive(thiserror::Error, Debug)]
pub enum ArticleError {
    #[error("Article not found")]
    NotFound,
    #[error("Author not found")]
    AuthorNotFound,
    #[error("Article already {0}d")]
    AlreadyReacted(Reaction),
    #[error("Only the author can modify an article")]
    Forbidden,
    #[error("Invalid article: {0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(thiserror::Error, Debug)]
pub enum UserError {
    #[error("Account already exists")]
    AccountExists,
    #[error("Account does not exist")]
    AccountNotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid current password")]
    InvalidPassword,
    #[error("Invalid user data: {0}")]
    Validation(String),
    #[error("Could not hash password: {0}")]
    Hashing(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(thiserror::Error, Debug)]
pub enum AuthenticationError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("Invalid JWT")]
    InvalidJwt(#[from] jwt::Error),
    #[error("JWT Token is expired. Please renew it")]
    ExpiredToken,
    #[error("Unsupported authentication scheme, only JWT Bearer is supported")]
    UnknownAuthScheme,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthenticationError::Unauthorized(_)
            | AuthenticationError::InvalidJwt(_)
            | AuthenticationError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthenticationError::UnknownAuthScheme => StatusCode::BAD_REQUEST,
            AuthenticationError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = match self {
            AuthenticationError::Other(_) => String::from("Unexpected authentication error"),
            other => other.to_string(),
        };

        crate::routes::problem(self.status_code(), "authentication", "Authentication failed", detail)
    }
}
