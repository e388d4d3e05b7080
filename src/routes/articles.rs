use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::model::article::{ArticleContent, Reaction};
use crate::routes::ApiError;
use crate::startup::AppState;

/// Feed of the authenticated user
#[get("/articles")]
#[tracing::instrument(skip(app_state))]
pub async fn feed(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let articles = app_state.feed_service.list_for_viewer(user.id).await?;

    Ok(HttpResponse::Ok().json(articles))
}

#[post("/articles")]
#[tracing::instrument(skip(app_state, content))]
pub async fn create_article(
    content: web::Json<ArticleContent>,
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let article = app_state
        .article_service
        .create(user.id, content.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(article.summary()))
}

#[get("/articles/mine")]
#[tracing::instrument(skip(app_state))]
pub async fn my_articles(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let articles = app_state.feed_service.list_by_author(user.id).await?;

    Ok(HttpResponse::Ok().json(articles))
}

#[get("/article/{id}")]
#[tracing::instrument(skip(app_state))]
pub async fn get_article(
    id: web::Path<Uuid>,
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let article = app_state
        .feed_service
        .get_detail(user.id, id.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(article))
}

#[patch("/article/{id}")]
#[tracing::instrument(skip(app_state, content))]
pub async fn update_article(
    id: web::Path<Uuid>,
    content: web::Json<ArticleContent>,
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    app_state
        .article_service
        .update(user.id, id.into_inner(), content.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Article updated" })))
}

#[delete("/article/{id}")]
#[tracing::instrument(skip(app_state))]
pub async fn delete_article(
    id: web::Path<Uuid>,
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    app_state
        .article_service
        .delete(user.id, id.into_inner())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

#[put("/article/{id}/like")]
#[tracing::instrument(skip(app_state))]
pub async fn like_article(
    id: web::Path<Uuid>,
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    app_state
        .reaction_service
        .react(user.id, id.into_inner(), Reaction::Like)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Article liked" })))
}

#[put("/article/{id}/dislike")]
#[tracing::instrument(skip(app_state))]
pub async fn dislike_article(
    id: web::Path<Uuid>,
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    app_state
        .reaction_service
        .react(user.id, id.into_inner(), Reaction::Dislike)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Article disliked" })))
}

#[put("/article/{id}/block")]
#[tracing::instrument(skip(app_state))]
pub async fn block_article(
    id: web::Path<Uuid>,
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    app_state
        .reaction_service
        .block(user.id, id.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Article blocked" })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(feed);
    cfg.service(create_article);
    cfg.service(my_articles);
    cfg.service(get_article);
    cfg.service(update_article);
    cfg.service(delete_article);
    cfg.service(like_article);
    cfg.service(dislike_article);
    cfg.service(block_article);
}
