use actix_web::cookie::{time, Cookie};
use actix_web::{post, web, HttpRequest, HttpResponse};
use chrono::Duration;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{issue_access_token, new_refresh_token, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::model::configuration::ApplicationConfiguration;
use crate::model::user::SignUpRequest;
use crate::routes::ApiError;
use crate::startup::AppState;

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    /// Email or phone number
    #[serde(rename = "loginId", alias = "login")]
    login_id: String,
    password: Secret<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    refresh_token: Secret<String>,
}

fn token_cookie(name: &'static str, value: String, ttl: Duration) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").http_only(true).finish();
    cookie.make_removal();
    cookie
}

/// The refresh token from the body if any, from the cookie otherwise
fn refresh_token_of(body: Option<web::Json<RefreshRequest>>, req: &HttpRequest) -> Option<String> {
    body.map(|body| body.refresh_token.expose_secret().clone())
        .or_else(|| {
            req.cookie(REFRESH_TOKEN_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
        .filter(|token| !token.is_empty())
}

#[post("/auth/sign-up")]
#[tracing::instrument(skip(app_state, configuration))]
pub async fn sign_up(
    request: web::Json<SignUpRequest>,
    app_state: web::Data<AppState>,
    configuration: web::Data<ApplicationConfiguration>,
) -> Result<HttpResponse, ApiError> {
    if !configuration.allow_account_creation {
        return Err(ApiError::AccountCreationDisabled);
    }

    let user = app_state.user_service.sign_up(request.into_inner()).await?;

    Ok(HttpResponse::Created().json(user))
}

#[post("/auth/sign-in")]
#[tracing::instrument(skip(app_state, configuration), level = "debug")]
pub async fn sign_in(
    login: web::Json<LoginRequest>,
    app_state: web::Data<AppState>,
    configuration: web::Data<ApplicationConfiguration>,
) -> Result<HttpResponse, ApiError> {
    let user = app_state
        .user_service
        .authenticate(&login.login_id, &login.password)
        .await?;

    let access_token = issue_access_token(
        &user,
        &configuration.jwt_secret,
        configuration.access_token_ttl,
    )?;
    let refresh_token = new_refresh_token();
    app_state
        .token_store
        .save(&refresh_token, user.id, configuration.refresh_token_ttl)
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(token_cookie(
            ACCESS_TOKEN_COOKIE,
            access_token.clone(),
            configuration.access_token_ttl,
        ))
        .cookie(token_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh_token.clone(),
            configuration.refresh_token_ttl,
        ))
        .json(json!({"accessToken": access_token, "refreshToken": refresh_token, "user": user})))
}

#[post("/auth/refresh")]
#[tracing::instrument(skip_all, level = "debug")]
pub async fn refresh_auth(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    app_state: web::Data<AppState>,
    configuration: web::Data<ApplicationConfiguration>,
) -> Result<HttpResponse, ApiError> {
    let token = refresh_token_of(body, &req).ok_or(ApiError::InvalidRefreshToken)?;

    let user_id = app_state
        .token_store
        .user_of(&token)
        .await?
        .ok_or(ApiError::InvalidRefreshToken)?;
    let user = app_state.user_service.profile(user_id).await?;

    let access_token = issue_access_token(
        &user,
        &configuration.jwt_secret,
        configuration.access_token_ttl,
    )?;

    Ok(HttpResponse::Ok()
        .cookie(token_cookie(
            ACCESS_TOKEN_COOKIE,
            access_token.clone(),
            configuration.access_token_ttl,
        ))
        .json(json!({ "accessToken": access_token })))
}

#[post("/auth/sign-out")]
#[tracing::instrument(skip_all, level = "debug")]
pub async fn sign_out(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    if let Some(token) = refresh_token_of(body, &req) {
        app_state.token_store.revoke(&token).await?;
    }

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(removal_cookie(REFRESH_TOKEN_COOKIE))
        .json(json!({ "message": "Signed out" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(sign_up);
    cfg.service(sign_in);
    cfg.service(refresh_auth);
    cfg.service(sign_out);
}
