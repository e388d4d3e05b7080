//! In-memory stores, for tests and local development.
//!
//! A single write lock covers each mutation, which makes every change atomic the same way the
//! postgres statements are.

use std::cmp::Reverse;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{ArticleStore, StorageResult, UserStore};
use crate::errors::StorageError;
use crate::model::article::{Article, ArticleContent, ArticleDetail, ArticleSummary, ReactionChange};
use crate::model::user::{NewUser, ProfileUpdate, User};

#[derive(Default)]
pub struct MemoryArticleStore {
    // Kept in insertion order
    articles: RwLock<Vec<Article>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an article as is, reactions included
    pub async fn insert(&self, article: Article) {
        self.articles.write().await.push(article);
    }

    async fn summaries<F>(&self, keep: F) -> Vec<ArticleSummary>
    where
        F: Fn(&Article) -> bool,
    {
        let articles = self.articles.read().await;
        // Reverse first so equal timestamps still list the latest insertion first
        let mut selected: Vec<&Article> = articles.iter().rev().filter(|a| keep(a)).collect();
        selected.sort_by_key(|article| Reverse(article.created_at));

        selected.into_iter().map(Article::summary).collect()
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn get(&self, article_id: Uuid) -> StorageResult<Option<Article>> {
        let articles = self.articles.read().await;

        Ok(articles.iter().find(|a| a.id == article_id).cloned())
    }

    async fn create(&self, author_id: Uuid, content: ArticleContent) -> StorageResult<Article> {
        let article = Article::new(author_id, content);
        self.articles.write().await.push(article.clone());

        Ok(article)
    }

    async fn update(&self, article_id: Uuid, content: ArticleContent) -> StorageResult<bool> {
        let mut articles = self.articles.write().await;

        match articles
            .iter_mut()
            .find(|a| a.id == article_id && !a.deleted)
        {
            Some(article) => {
                article.apply(content);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn persist_reaction_change(
        &self,
        article_id: Uuid,
        user_id: Uuid,
        change: ReactionChange,
    ) -> StorageResult<bool> {
        let mut articles = self.articles.write().await;

        Ok(articles
            .iter_mut()
            .find(|a| a.id == article_id)
            .map(|article| article.apply_reaction_change(user_id, change))
            .unwrap_or(false))
    }

    async fn mark_deleted(&self, article_id: Uuid) -> StorageResult<bool> {
        let mut articles = self.articles.write().await;

        match articles
            .iter_mut()
            .find(|a| a.id == article_id && !a.deleted)
        {
            Some(article) => {
                article.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_preferred(
        &self,
        viewer_id: Uuid,
        preference: &[String],
    ) -> StorageResult<Vec<ArticleSummary>> {
        Ok(self
            .summaries(|article| article.is_in_feed_of(viewer_id, preference))
            .await)
    }

    async fn list_by_author(&self, author_id: Uuid) -> StorageResult<Vec<ArticleSummary>> {
        Ok(self
            .summaries(|article| article.author_id == author_id && !article.deleted)
            .await)
    }

    async fn detail(
        &self,
        viewer_id: Uuid,
        article_id: Uuid,
    ) -> StorageResult<Option<ArticleDetail>> {
        let articles = self.articles.read().await;

        Ok(articles
            .iter()
            .find(|a| a.id == article_id && !a.deleted)
            .map(|article| article.detail_for(viewer_id)))
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, user_id: Uuid) -> StorageResult<Option<User>> {
        let users = self.users.read().await;

        Ok(users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let users = self.users.read().await;

        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> StorageResult<Option<User>> {
        let users = self.users.read().await;

        Ok(users.iter().find(|u| u.phone == phone).cloned())
    }

    async fn insert(&self, user: NewUser) -> StorageResult<User> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.email == user.email || u.phone == user.phone)
        {
            return Err(StorageError::Duplicate);
        }

        let user = user.into_user(Uuid::new_v4());
        users.push(user.clone());

        Ok(user)
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> StorageResult<bool> {
        let mut users = self.users.write().await;

        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.first_name = update.first_name;
                user.last_name = update.last_name;
                user.preference = update.preference;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_password(&self, user_id: Uuid, password_hash: String) -> StorageResult<bool> {
        let mut users = self.users.write().await;

        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.password = password_hash;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
