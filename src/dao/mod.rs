use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::StorageError;
use crate::model::article::{Article, ArticleContent, ArticleDetail, ArticleSummary, ReactionChange};
use crate::model::user::{NewUser, ProfileUpdate, User};

pub mod articles;
pub mod memory;
pub mod users;

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence of articles, their reaction sets, and the feed reads.
///
/// Every mutation is a single atomic operation of the backend: implementations never read the
/// article, modify it and write it back.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fetch an article with its reaction sets, deleted ones included
    async fn get(&self, article_id: Uuid) -> StorageResult<Option<Article>>;

    async fn create(&self, author_id: Uuid, content: ArticleContent) -> StorageResult<Article>;

    /// Author edit of a non deleted article. An empty image list keeps the current images.
    async fn update(&self, article_id: Uuid, content: ArticleContent) -> StorageResult<bool>;

    /// Apply a reaction change if its precondition holds. Returns `false` when nothing changed.
    async fn persist_reaction_change(
        &self,
        article_id: Uuid,
        user_id: Uuid,
        change: ReactionChange,
    ) -> StorageResult<bool>;

    /// Add the user to the blocks of the article. Returns `false` if they were already there.
    async fn set_blocked(&self, article_id: Uuid, user_id: Uuid) -> StorageResult<bool> {
        self.persist_reaction_change(article_id, user_id, ReactionChange::block())
            .await
    }

    /// Soft delete: the record is kept with its deleted flag set
    async fn mark_deleted(&self, article_id: Uuid) -> StorageResult<bool>;

    /// Non deleted articles sharing a category with the preference and not blocked by the
    /// viewer, newest first
    async fn list_preferred(
        &self,
        viewer_id: Uuid,
        preference: &[String],
    ) -> StorageResult<Vec<ArticleSummary>>;

    /// Non deleted articles of an author, newest first
    async fn list_by_author(&self, author_id: Uuid) -> StorageResult<Vec<ArticleSummary>>;

    /// A non deleted article, with the viewer's reaction
    async fn detail(&self, viewer_id: Uuid, article_id: Uuid)
        -> StorageResult<Option<ArticleDetail>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> StorageResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    async fn find_by_phone(&self, phone: &str) -> StorageResult<Option<User>>;

    /// Store a new user. Fails with [`StorageError::Duplicate`] when the email or phone is taken.
    async fn insert(&self, user: NewUser) -> StorageResult<User>;

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> StorageResult<bool>;

    async fn update_password(&self, user_id: Uuid, password_hash: String) -> StorageResult<bool>;
}
