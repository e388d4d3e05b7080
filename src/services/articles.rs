use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::dao::{ArticleStore, UserStore};
use crate::errors::ArticleError;
use crate::model::article::{Article, ArticleContent};

/// Authoring of articles: creation, edition and soft deletion
#[derive(Clone)]
pub struct ArticleService {
    articles: Arc<dyn ArticleStore>,
    users: Arc<dyn UserStore>,
}

impl ArticleService {
    pub fn new(articles: Arc<dyn ArticleStore>, users: Arc<dyn UserStore>) -> Self {
        Self { articles, users }
    }

    #[instrument(skip(self, content))]
    pub async fn create(
        &self,
        author_id: Uuid,
        content: ArticleContent,
    ) -> Result<Article, ArticleError> {
        if self.users.get(author_id).await?.is_none() {
            return Err(ArticleError::AuthorNotFound);
        }

        let content = content.validated_for_creation()?;
        let article = self.articles.create(author_id, content).await?;
        tracing::info!("Article {} created by {}", article.id, author_id);

        Ok(article)
    }

    /// Edit an article. Only its author can do it.
    #[instrument(skip(self, content))]
    pub async fn update(
        &self,
        user_id: Uuid,
        article_id: Uuid,
        content: ArticleContent,
    ) -> Result<(), ArticleError> {
        self.owned_article(user_id, article_id).await?;
        let content = content.validated()?;

        if self.articles.update(article_id, content).await? {
            Ok(())
        } else {
            // Deleted in the meantime
            Err(ArticleError::NotFound)
        }
    }

    /// Soft delete an article. Only its author can do it.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: Uuid, article_id: Uuid) -> Result<(), ArticleError> {
        self.owned_article(user_id, article_id).await?;

        if self.articles.mark_deleted(article_id).await? {
            tracing::info!("Article {} deleted", article_id);
            Ok(())
        } else {
            Err(ArticleError::NotFound)
        }
    }

    async fn owned_article(&self, user_id: Uuid, article_id: Uuid) -> Result<Article, ArticleError> {
        let article = match self.articles.get(article_id).await? {
            Some(article) if !article.deleted => article,
            _ => return Err(ArticleError::NotFound),
        };

        if article.author_id != user_id {
            return Err(ArticleError::Forbidden);
        }

        Ok(article)
    }
}
