use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::dao::{ArticleStore, UserStore};
use crate::errors::ArticleError;
use crate::model::article::{ArticleDetail, ArticleSummary};

/// Read side of the articles: the preference based feed, an author's list, a single article
#[derive(Clone)]
pub struct FeedService {
    articles: Arc<dyn ArticleStore>,
    users: Arc<dyn UserStore>,
}

impl FeedService {
    pub fn new(articles: Arc<dyn ArticleStore>, users: Arc<dyn UserStore>) -> Self {
        Self { articles, users }
    }

    /// Articles matching the viewer's preference, minus the ones they blocked. An unknown viewer
    /// gets an empty feed.
    #[instrument(skip(self))]
    pub async fn list_for_viewer(&self, viewer_id: Uuid) -> Result<Vec<ArticleSummary>, ArticleError> {
        let preference = match self.users.get(viewer_id).await? {
            Some(user) => user.preference,
            None => {
                tracing::debug!("Unknown viewer {}, empty feed", viewer_id);
                return Ok(vec![]);
            }
        };

        if preference.is_empty() {
            return Ok(vec![]);
        }

        Ok(self.articles.list_preferred(viewer_id, &preference).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_detail(
        &self,
        viewer_id: Uuid,
        article_id: Uuid,
    ) -> Result<ArticleDetail, ArticleError> {
        self.articles
            .detail(viewer_id, article_id)
            .await?
            .ok_or(ArticleError::NotFound)
    }

    /// Every live article of an author, whatever the preference and blocks
    #[instrument(skip(self))]
    pub async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<ArticleSummary>, ArticleError> {
        Ok(self.articles.list_by_author(author_id).await?)
    }
}
