use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::ArticleError;

/// Maximum number of images attached to an article
pub const MAX_IMAGES: usize = 2;

/// A like or a dislike. Blocks are tracked apart, see [`ReactionSet`].
#[derive(sqlx::Type, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[sqlx(type_name = "reaction_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn opposite(self) -> Self {
        match self {
            Reaction::Like => Reaction::Dislike,
            Reaction::Dislike => Reaction::Like,
        }
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reaction::Like => f.write_str("like"),
            Reaction::Dislike => f.write_str("dislike"),
        }
    }
}

/// One of the three user id sets carried by an article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionSet {
    Likes,
    Dislikes,
    Blocks,
}

impl ReactionSet {
    /// The reaction stored for this set, `None` for blocks
    pub fn reaction(self) -> Option<Reaction> {
        match self {
            ReactionSet::Likes => Some(Reaction::Like),
            ReactionSet::Dislikes => Some(Reaction::Dislike),
            ReactionSet::Blocks => None,
        }
    }
}

impl From<Reaction> for ReactionSet {
    fn from(reaction: Reaction) -> Self {
        match reaction {
            Reaction::Like => ReactionSet::Likes,
            Reaction::Dislike => ReactionSet::Dislikes,
        }
    }
}

/// Where a user stands regarding an article, blocks aside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
    Neutral,
    Liked,
    Disliked,
}

/// A single atomic mutation of the reaction sets of an article.
///
/// When `remove_from` is set, the change only applies if the user currently is in that set, and
/// both the removal and the addition happen in the same storage operation. Without it, a like or
/// a dislike only applies when the user has no reaction yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionChange {
    pub add_to: ReactionSet,
    pub remove_from: Option<Reaction>,
}

impl ReactionChange {
    pub fn add(reaction: Reaction) -> Self {
        ReactionChange {
            add_to: reaction.into(),
            remove_from: None,
        }
    }

    pub fn switch_to(reaction: Reaction) -> Self {
        ReactionChange {
            add_to: reaction.into(),
            remove_from: Some(reaction.opposite()),
        }
    }

    pub fn block() -> Self {
        ReactionChange {
            add_to: ReactionSet::Blocks,
            remove_from: None,
        }
    }
}

/// An article, with the ids of the users who reacted to it
#[derive(Debug, Clone)]
pub struct Article {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Vec<String>,
    pub images: Vec<String>,
    pub likes: HashSet<Uuid>,
    pub dislikes: HashSet<Uuid>,
    pub blocks: HashSet<Uuid>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Build a brand new article, without any reaction
    pub fn new(author_id: Uuid, content: ArticleContent) -> Self {
        let now = Utc::now();

        Article {
            id: Uuid::new_v4(),
            author_id,
            name: content.name,
            description: content.description,
            category: content.category,
            images: content.images,
            likes: HashSet::new(),
            dislikes: HashSet::new(),
            blocks: HashSet::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn reaction_of(&self, user_id: Uuid) -> ReactionState {
        if self.likes.contains(&user_id) {
            ReactionState::Liked
        } else if self.dislikes.contains(&user_id) {
            ReactionState::Disliked
        } else {
            ReactionState::Neutral
        }
    }

    pub fn is_blocked_by(&self, user_id: Uuid) -> bool {
        self.blocks.contains(&user_id)
    }

    pub fn matches_any(&self, preference: &[String]) -> bool {
        self.category.iter().any(|tag| preference.contains(tag))
    }

    /// Should this article show up in the feed of the given viewer
    pub fn is_in_feed_of(&self, viewer_id: Uuid, preference: &[String]) -> bool {
        !self.deleted && self.matches_any(preference) && !self.is_blocked_by(viewer_id)
    }

    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            id: self.id,
            author_id: self.author_id,
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            images: self.images.clone(),
            likes_count: self.likes.len() as i64,
            dislikes_count: self.dislikes.len() as i64,
            blocks_count: self.blocks.len() as i64,
            created_at: self.created_at,
        }
    }

    pub fn detail_for(&self, viewer_id: Uuid) -> ArticleDetail {
        ArticleDetail {
            summary: self.summary(),
            is_liked: self.likes.contains(&viewer_id),
            is_disliked: self.dislikes.contains(&viewer_id),
        }
    }

    /// Apply an author edit. An empty image list keeps the current images.
    pub fn apply(&mut self, content: ArticleContent) {
        self.name = content.name;
        self.description = content.description;
        self.category = content.category;
        if !content.images.is_empty() {
            self.images = content.images;
        }
        self.updated_at = Utc::now();
    }

    /// Apply a reaction change if its precondition holds, returning whether something changed
    pub fn apply_reaction_change(&mut self, user_id: Uuid, change: ReactionChange) -> bool {
        match (change.add_to, change.remove_from) {
            (ReactionSet::Blocks, _) => self.blocks.insert(user_id),
            (target, None) => {
                if self.reaction_of(user_id) != ReactionState::Neutral {
                    return false;
                }
                self.set_mut(target).insert(user_id)
            }
            (target, Some(previous)) => {
                if !self.set_mut(previous.into()).remove(&user_id) {
                    return false;
                }
                self.set_mut(target).insert(user_id);
                true
            }
        }
    }

    fn set_mut(&mut self, set: ReactionSet) -> &mut HashSet<Uuid> {
        match set {
            ReactionSet::Likes => &mut self.likes,
            ReactionSet::Dislikes => &mut self.dislikes,
            ReactionSet::Blocks => &mut self.blocks,
        }
    }
}

/// What the author writes: everything but the reactions
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    pub name: String,
    pub description: String,
    pub category: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ArticleContent {
    /// Trim and check the content of a new article, which needs at least one image
    pub fn validated_for_creation(self) -> Result<Self, ArticleError> {
        let content = self.validated()?;
        if content.images.is_empty() {
            return Err(ArticleError::Validation(
                "at least one image is required".into(),
            ));
        }

        Ok(content)
    }

    /// Trim and check the content of an article
    pub fn validated(self) -> Result<Self, ArticleError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ArticleError::Validation("article name is required".into()));
        }

        let description = self.description.trim().to_owned();
        if description.is_empty() {
            return Err(ArticleError::Validation("description is required".into()));
        }

        let mut category: Vec<String> = Vec::with_capacity(self.category.len());
        for tag in self.category.iter().map(|tag| tag.trim()) {
            if !tag.is_empty() && !category.iter().any(|known| known == tag) {
                category.push(tag.to_owned());
            }
        }
        if category.is_empty() {
            return Err(ArticleError::Validation("category is required".into()));
        }

        if self.images.len() > MAX_IMAGES {
            return Err(ArticleError::Validation(format!(
                "at most {MAX_IMAGES} images are allowed"
            )));
        }
        let images: Vec<String> = self.images.iter().map(|url| url.trim().to_owned()).collect();
        if images.iter().any(|url| url.is_empty()) {
            return Err(ArticleError::Validation("image reference is blank".into()));
        }

        Ok(ArticleContent {
            name,
            description,
            category,
            images,
        })
    }
}

/// Public projection of an article: reaction counts only, never who reacted
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Vec<String>,
    pub images: Vec<String>,
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub blocks_count: i64,
    pub created_at: DateTime<Utc>,
}

/// An article summary along with the viewer's own reaction
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub summary: ArticleSummary,
    pub is_liked: bool,
    pub is_disliked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(category: &[&str]) -> ArticleContent {
        ArticleContent {
            name: "Rust 2024".into(),
            description: "What's new".into(),
            category: category.iter().map(|x| x.to_string()).collect(),
            images: vec!["https://img.example/1.png".into()],
        }
    }

    #[test]
    fn switching_reaction_moves_the_user_between_sets() {
        let user = Uuid::new_v4();
        let mut article = Article::new(Uuid::new_v4(), content(&["tech"]));

        assert!(article.apply_reaction_change(user, ReactionChange::add(Reaction::Dislike)));
        assert_eq!(article.reaction_of(user), ReactionState::Disliked);

        assert!(article.apply_reaction_change(user, ReactionChange::switch_to(Reaction::Like)));
        assert_eq!(article.reaction_of(user), ReactionState::Liked);
        assert!(article.dislikes.is_empty());
    }

    #[test]
    fn reaction_change_with_stale_precondition_is_refused() {
        let user = Uuid::new_v4();
        let mut article = Article::new(Uuid::new_v4(), content(&["tech"]));
        article.likes.insert(user);

        assert!(!article.apply_reaction_change(user, ReactionChange::add(Reaction::Dislike)));
        assert!(!article.apply_reaction_change(user, ReactionChange::switch_to(Reaction::Like)));
        assert_eq!(article.likes.len(), 1);
        assert!(article.dislikes.is_empty());
    }

    #[test]
    fn block_leaves_likes_untouched() {
        let user = Uuid::new_v4();
        let mut article = Article::new(Uuid::new_v4(), content(&["tech"]));
        article.likes.insert(user);

        assert!(article.apply_reaction_change(user, ReactionChange::block()));
        assert!(!article.apply_reaction_change(user, ReactionChange::block()));
        assert_eq!(article.reaction_of(user), ReactionState::Liked);
        assert_eq!(article.blocks.len(), 1);
    }

    #[test]
    fn feed_visibility() {
        let viewer = Uuid::new_v4();
        let preference = vec!["tech".to_owned()];
        let mut article = Article::new(Uuid::new_v4(), content(&["news", "tech"]));

        assert!(article.is_in_feed_of(viewer, &preference));
        assert!(!article.is_in_feed_of(viewer, &["news-only".to_owned()]));

        article.blocks.insert(viewer);
        assert!(!article.is_in_feed_of(viewer, &preference));

        article.blocks.clear();
        article.deleted = true;
        assert!(!article.is_in_feed_of(viewer, &preference));
    }

    #[test]
    fn detail_exposes_counts_and_viewer_flags() {
        let viewer = Uuid::new_v4();
        let mut article = Article::new(Uuid::new_v4(), content(&["tech"]));
        article.likes.insert(viewer);
        article.dislikes.insert(Uuid::new_v4());
        article.dislikes.insert(Uuid::new_v4());

        let detail = article.detail_for(viewer);
        assert_eq!(detail.summary.likes_count, 1);
        assert_eq!(detail.summary.dislikes_count, 2);
        assert_eq!(detail.summary.blocks_count, 0);
        assert!(detail.is_liked);
        assert!(!detail.is_disliked);
    }

    #[test]
    fn content_is_trimmed_and_deduplicated() {
        let raw = ArticleContent {
            name: "  Rust  ".into(),
            description: " desc ".into(),
            category: vec![" tech ".into(), "tech".into(), " ".into(), "news".into()],
            images: vec![],
        };

        let content = raw.validated().unwrap();
        assert_eq!(content.name, "Rust");
        assert_eq!(content.description, "desc");
        assert_eq!(content.category, vec!["tech".to_owned(), "news".to_owned()]);
    }

    #[test]
    fn invalid_content_is_rejected() {
        let mut no_name = content(&["tech"]);
        no_name.name = "   ".into();
        assert!(matches!(no_name.validated(), Err(ArticleError::Validation(_))));

        assert!(matches!(
            content(&[" "]).validated(),
            Err(ArticleError::Validation(_))
        ));

        let mut too_many_images = content(&["tech"]);
        too_many_images.images = vec!["a".into(), "b".into(), "c".into()];
        assert!(matches!(
            too_many_images.validated(),
            Err(ArticleError::Validation(_))
        ));

        let mut no_image = content(&["tech"]);
        no_image.images.clear();
        assert!(no_image.clone().validated().is_ok());
        assert!(matches!(
            no_image.validated_for_creation(),
            Err(ArticleError::Validation(_))
        ));
    }
}
