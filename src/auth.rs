use std::future::{ready, Ready};

use actix_web::http::header::HeaderMap;
use actix_web::web::Data;
use actix_web::{dev, FromRequest, HttpRequest};
use anyhow::anyhow;
use chrono::LocalResult::Single;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::errors::AuthenticationError;
use crate::model::configuration::ApplicationConfiguration;
use crate::model::user::User;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// # Represent an authenticated user, from the JWT
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
}

impl AuthenticatedUser {
    pub fn from_user(user: &User) -> Self {
        AuthenticatedUser {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
/// # JWT claims
struct Claims {
    user: AuthenticatedUser,
    exp: i64,
}

impl FromRequest for AuthenticatedUser {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    #[tracing::instrument(skip_all)]
    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(extract_authenticated_user(req))
    }
}

/// # Extract the authenticated user from the request
fn extract_authenticated_user(req: &HttpRequest) -> Result<AuthenticatedUser, AuthenticationError> {
    let configuration = req
        .app_data::<Data<ApplicationConfiguration>>()
        .ok_or_else(|| anyhow!("Configuration is not registered as application data"))?;

    let token = match extract_bearer_token(req.headers())? {
        Some(token) => token,
        // No header? Maybe the browser sent us the cookie
        None => req
            .cookie(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_owned())
            .ok_or_else(|| {
                AuthenticationError::Unauthorized("Missing Authorization header value".into())
            })?,
    };

    verify_access_token(&token, &configuration.jwt_secret)
}

/// # Extract the token from a bearer Authorization header, if there is one
fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, AuthenticationError> {
    let header_value = match headers.get("Authorization") {
        None => return Ok(None),
        Some(header) => header.to_str().map_err(|x| {
            AuthenticationError::Unauthorized(format!("Invalid Authentication header value: {}", x))
        })?,
    };

    let mut split_header = header_value.split_whitespace();
    match (split_header.next(), split_header.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(Some(token.to_owned()))
        }
        (Some(_), Some(_)) => Err(AuthenticationError::UnknownAuthScheme),
        _ => Err(AuthenticationError::Unauthorized(
            "Invalid Authorization header value".into(),
        )),
    }
}

fn signing_key(secret: &Secret<String>) -> Result<Hmac<Sha256>, AuthenticationError> {
    Hmac::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| AuthenticationError::Other(anyhow!("Invalid JWT secret: {e}")))
}

/// # Generate a JWT for the given user
pub fn issue_access_token(
    user: &User,
    secret: &Secret<String>,
    ttl: Duration,
) -> Result<String, AuthenticationError> {
    let utc: DateTime<Utc> = Utc::now() + ttl;

    let claims = Claims {
        user: AuthenticatedUser::from_user(user),
        exp: utc.timestamp(),
    };

    Ok(claims.sign_with_key(&signing_key(secret)?)?)
}

/// # Opaque token used to get new access tokens
pub fn new_refresh_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn verify_access_token(
    token: &str,
    secret: &Secret<String>,
) -> Result<AuthenticatedUser, AuthenticationError> {
    let claims: Claims = token.verify_with_key(&signing_key(secret)?)?;

    let date = if let Single(t) = Utc.timestamp_opt(claims.exp, 0) {
        t
    } else {
        return Err(AuthenticationError::ExpiredToken);
    };

    if date.lt(&Utc::now()) {
        return Err(AuthenticationError::ExpiredToken);
    }

    Ok(claims.user)
}
