use std::net::TcpListener;
use std::sync::Arc;

use actix_cors::Cors;
use actix_governor::Governor;
use actix_web::http::header;
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};

use crate::dao::{ArticleStore, UserStore};
use crate::model::configuration::ApplicationConfiguration;
use crate::rate_limiting::build_rate_limiting_conf;
use crate::routes;
use crate::services::articles::ArticleService;
use crate::services::feed::FeedService;
use crate::services::reactions::ReactionService;
use crate::services::users::UserService;
use crate::store::RefreshTokenStore;

/// Everything the routes need, shared between the workers
#[derive(Clone)]
pub struct AppState {
    pub article_service: ArticleService,
    pub reaction_service: ReactionService,
    pub feed_service: FeedService,
    pub user_service: UserService,
    pub token_store: Arc<dyn RefreshTokenStore>,
}

pub fn build_state(
    articles: Arc<dyn ArticleStore>,
    users: Arc<dyn UserStore>,
    token_store: Arc<dyn RefreshTokenStore>,
) -> AppState {
    AppState {
        article_service: ArticleService::new(articles.clone(), users.clone()),
        reaction_service: ReactionService::new(articles.clone()),
        feed_service: FeedService::new(articles, users.clone()),
        user_service: UserService::new(users),
        token_store,
    }
}

/// Only the front end may call the API from a browser, with its cookies
pub fn cors(configuration: &ApplicationConfiguration) -> Cors {
    Cors::default()
        .allowed_origin(&configuration.front_end_url)
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .supports_credentials()
        .max_age(3600)
}

pub async fn startup(
    state: AppState,
    configuration: ApplicationConfiguration,
    listener: TcpListener,
) -> anyhow::Result<()> {
    let governor_conf = build_rate_limiting_conf(&configuration)?;
    let state = Data::new(state);
    let configuration = Data::new(configuration);

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&configuration))
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(state.clone())
            .app_data(configuration.clone())
            .service(routes::ping)
            .service(
                web::scope("/api/v1")
                    .wrap(Governor::new(&governor_conf))
                    .configure(routes::configure),
            )
            .service(actix_files::Files::new("/", "./static/").index_file("index.html"))
    })
    .listen(listener)?
    .run()
    .await?;

    Ok(())
}
