use actix_web::{get, patch, web, HttpResponse};
use secrecy::ExposeSecret;
use serde_json::json;

use crate::auth::AuthenticatedUser;
use crate::model::user::{PasswordChangeRequest, ProfileUpdate};
use crate::routes::ApiError;
use crate::startup::AppState;

#[get("/user")]
#[tracing::instrument(skip(app_state))]
pub async fn get_profile(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let profile = app_state.user_service.profile(user.id).await?;

    Ok(HttpResponse::Ok().json(profile))
}

#[patch("/user")]
#[tracing::instrument(skip(app_state))]
pub async fn update_profile(
    update: web::Json<ProfileUpdate>,
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let profile = app_state
        .user_service
        .update_profile(user.id, update.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(profile))
}

#[patch("/user/update-password")]
#[tracing::instrument(skip(app_state, request))]
pub async fn update_password(
    request: web::Json<PasswordChangeRequest>,
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    if request.new_password.expose_secret() != request.confirm_password.expose_secret() {
        return Err(ApiError::PasswordMismatch);
    }

    app_state
        .user_service
        .change_password(user.id, &request.current_password, &request.new_password)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Password updated" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_profile);
    cfg.service(update_profile);
    cfg.service(update_password);
}
