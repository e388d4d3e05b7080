#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use secrecy::Secret;
use uuid::Uuid;

use article_feed::dao::memory::{MemoryArticleStore, MemoryUserStore};
use article_feed::dao::UserStore;
use article_feed::model::article::{Article, ArticleContent};
use article_feed::model::configuration::ApplicationConfiguration;
use article_feed::model::user::{NewUser, User};
use article_feed::startup::{build_state, AppState};
use article_feed::store::MemoryTokenStore;

pub struct TestContext {
    pub articles: Arc<MemoryArticleStore>,
    pub users: Arc<MemoryUserStore>,
    pub state: AppState,
}

impl TestContext {
    pub fn new() -> Self {
        let articles = Arc::new(MemoryArticleStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let state = build_state(
            articles.clone(),
            users.clone(),
            Arc::new(MemoryTokenStore::new()),
        );

        TestContext {
            articles,
            users,
            state,
        }
    }

    /// Store a user with the given preference, the password is not usable for sign-in
    pub async fn user(&self, preference: &[&str]) -> User {
        let id = Uuid::new_v4().simple().to_string();

        self.users
            .insert(NewUser {
                first_name: "Jane".into(),
                last_name: "Doe".into(),
                email: format!("{id}@example.com"),
                phone: id,
                password_hash: String::new(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                preference: tags(preference),
            })
            .await
            .unwrap()
    }

    /// Store an article created `age_minutes` ago
    pub async fn article(&self, author: &User, category: &[&str], age_minutes: i64) -> Article {
        let mut article = Article::new(author.id, content("An article", category));
        article.created_at = Utc::now() - Duration::minutes(age_minutes);
        self.articles.insert(article.clone()).await;

        article
    }

    /// Store an already built article, reactions and all
    pub async fn insert(&self, article: Article) -> Article {
        self.articles.insert(article.clone()).await;

        article
    }
}

pub fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|x| x.to_string()).collect()
}

pub fn content(name: &str, category: &[&str]) -> ArticleContent {
    ArticleContent {
        name: name.into(),
        description: "Some description".into(),
        category: tags(category),
        images: vec!["https://img.example/cover.png".into()],
    }
}

pub fn configuration() -> ApplicationConfiguration {
    ApplicationConfiguration::new(Secret::new("test-secret-for-jwt".to_owned()))
}
