use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::dao::ArticleStore;
use crate::errors::{ArticleError, StorageError};
use crate::model::article::{Article, Reaction, ReactionChange, ReactionState};

/// Conditional updates lost to concurrent reactions are retried this many times
const MAX_ATTEMPTS: usize = 3;

/// Decides how a like, dislike or block mutates the reaction sets of an article
#[derive(Clone)]
pub struct ReactionService {
    articles: Arc<dyn ArticleStore>,
}

impl ReactionService {
    pub fn new(articles: Arc<dyn ArticleStore>) -> Self {
        Self { articles }
    }

    /// Like or dislike an article.
    ///
    /// Switching from the opposite reaction is a single store operation. Repeating the current
    /// reaction fails with [`ArticleError::AlreadyReacted`] and changes nothing.
    #[instrument(skip(self))]
    pub async fn react(
        &self,
        user_id: Uuid,
        article_id: Uuid,
        reaction: Reaction,
    ) -> Result<(), ArticleError> {
        for _ in 0..MAX_ATTEMPTS {
            let article = self.live_article(article_id).await?;

            let change = match (article.reaction_of(user_id), reaction) {
                (ReactionState::Liked, Reaction::Like)
                | (ReactionState::Disliked, Reaction::Dislike) => {
                    return Err(ArticleError::AlreadyReacted(reaction))
                }
                (ReactionState::Neutral, _) => ReactionChange::add(reaction),
                _ => ReactionChange::switch_to(reaction),
            };

            if self
                .articles
                .persist_reaction_change(article_id, user_id, change)
                .await?
            {
                tracing::debug!("Applied {:?}", change);
                return Ok(());
            }

            // Someone else changed this user's reaction between our read and our write
            tracing::debug!("Reaction state moved under us, retrying");
        }

        Err(StorageError::Contended.into())
    }

    /// Block an article. Blocking twice is fine, likes and dislikes are left alone.
    #[instrument(skip(self))]
    pub async fn block(&self, user_id: Uuid, article_id: Uuid) -> Result<(), ArticleError> {
        self.live_article(article_id).await?;

        if !self.articles.set_blocked(article_id, user_id).await? {
            tracing::debug!("Article {} was already blocked", article_id);
        }

        Ok(())
    }

    async fn live_article(&self, article_id: Uuid) -> Result<Article, ArticleError> {
        match self.articles.get(article_id).await? {
            Some(article) if !article.deleted => Ok(article),
            _ => Err(ArticleError::NotFound),
        }
    }
}
