use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::dao::{ArticleStore, StorageResult};
use crate::model::article::{
    Article, ArticleContent, ArticleDetail, ArticleSummary, ReactionChange,
};

/// Columns of an [`ArticleSummary`], selected from `articles a`
const SUMMARY_COLUMNS: &str = r#"
        SELECT  a.id,
                a.author_id,
                a.name,
                a.description,
                a.category,
                a.images,
                a.created_at,
                (SELECT COUNT(*) FROM article_reactions r WHERE r.article_id = a.id AND r.reaction = 'like')    AS likes_count,
                (SELECT COUNT(*) FROM article_reactions r WHERE r.article_id = a.id AND r.reaction = 'dislike') AS dislikes_count,
                (SELECT COUNT(*) FROM article_blocks b WHERE b.article_id = a.id)                               AS blocks_count
"#;

#[derive(FromRow)]
struct ArticleRow {
    id: Uuid,
    author_id: Uuid,
    name: String,
    description: String,
    category: Vec<String>,
    images: Vec<String>,
    likes: Vec<Uuid>,
    dislikes: Vec<Uuid>,
    blocks: Vec<Uuid>,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            author_id: row.author_id,
            name: row.name,
            description: row.description,
            category: row.category,
            images: row.images,
            likes: row.likes.into_iter().collect(),
            dislikes: row.dislikes.into_iter().collect(),
            blocks: row.blocks.into_iter().collect(),
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres backed article store.
///
/// Likes and dislikes share the `article_reactions` table, keyed by (article, user), so a user
/// holds at most one of them. Blocks live in `article_blocks`.
#[derive(Clone)]
pub struct PgArticleStore {
    db: PgPool,
}

impl PgArticleStore {
    pub fn new(db: PgPool) -> Self {
        PgArticleStore { db }
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    #[instrument(skip(self))]
    async fn get(&self, article_id: Uuid) -> StorageResult<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT  a.id,
                    a.author_id,
                    a.name,
                    a.description,
                    a.category,
                    a.images,
                    a.deleted,
                    a.created_at,
                    a.updated_at,
                    ARRAY(SELECT r.user_id FROM article_reactions r WHERE r.article_id = a.id AND r.reaction = 'like')    AS likes,
                    ARRAY(SELECT r.user_id FROM article_reactions r WHERE r.article_id = a.id AND r.reaction = 'dislike') AS dislikes,
                    ARRAY(SELECT b.user_id FROM article_blocks b WHERE b.article_id = a.id)                               AS blocks
            FROM    articles a
            WHERE   a.id = $1
            "#,
        )
        .bind(article_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Article::from))
    }

    #[instrument(skip(self, content))]
    async fn create(&self, author_id: Uuid, content: ArticleContent) -> StorageResult<Article> {
        let article = Article::new(author_id, content);

        sqlx::query(
            r#"
            INSERT INTO articles (id, author_id, name, description, category, images, deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, $7, $7)
            "#,
        )
        .bind(article.id)
        .bind(article.author_id)
        .bind(&article.name)
        .bind(&article.description)
        .bind(&article.category)
        .bind(&article.images)
        .bind(article.created_at)
        .execute(&self.db)
        .await?;

        Ok(article)
    }

    #[instrument(skip(self, content))]
    async fn update(&self, article_id: Uuid, content: ArticleContent) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE  articles
            SET     name = $2,
                    description = $3,
                    category = $4,
                    images = CASE WHEN cardinality($5::text[]) > 0 THEN $5 ELSE images END,
                    updated_at = $6
            WHERE   id = $1
            AND     deleted = false
            "#,
        )
        .bind(article_id)
        .bind(&content.name)
        .bind(&content.description)
        .bind(&content.category)
        .bind(&content.images)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn persist_reaction_change(
        &self,
        article_id: Uuid,
        user_id: Uuid,
        change: ReactionChange,
    ) -> StorageResult<bool> {
        let now = Utc::now();

        let result = match (change.add_to.reaction(), change.remove_from) {
            (None, _) => {
                sqlx::query(
                    r#"
                    INSERT INTO article_blocks (article_id, user_id, blocked_at) VALUES ($1, $2, $3)
                    ON CONFLICT (article_id, user_id) DO NOTHING
                    "#,
                )
                .bind(article_id)
                .bind(user_id)
                .bind(now)
                .execute(&self.db)
                .await?
            }
            (Some(reaction), None) => {
                sqlx::query(
                    r#"
                    INSERT INTO article_reactions (article_id, user_id, reaction, reacted_at) VALUES ($1, $2, $3, $4)
                    ON CONFLICT (article_id, user_id) DO NOTHING
                    "#,
                )
                .bind(article_id)
                .bind(user_id)
                .bind(reaction)
                .bind(now)
                .execute(&self.db)
                .await?
            }
            // Switching is one conditional update of the tagged row: the user leaves the
            // previous set and joins the new one at once
            (Some(reaction), Some(previous)) => {
                sqlx::query(
                    r#"
                    UPDATE  article_reactions
                    SET     reaction = $3, reacted_at = $5
                    WHERE   article_id = $1
                    AND     user_id = $2
                    AND     reaction = $4
                    "#,
                )
                .bind(article_id)
                .bind(user_id)
                .bind(reaction)
                .bind(previous)
                .bind(now)
                .execute(&self.db)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn mark_deleted(&self, article_id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE articles SET deleted = true, updated_at = $2 WHERE id = $1 AND deleted = false
            "#,
        )
        .bind(article_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_preferred(
        &self,
        viewer_id: Uuid,
        preference: &[String],
    ) -> StorageResult<Vec<ArticleSummary>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_COLUMNS);
        query.push(
            r#"
        FROM    articles a
        WHERE   a.deleted = false
        AND     a.category && "#,
        );
        query.push_bind(preference.to_vec());
        query.push(
            r#"
        AND     NOT EXISTS (SELECT 1 FROM article_blocks b WHERE b.article_id = a.id AND b.user_id = "#,
        );
        query.push_bind(viewer_id);
        query.push(
            r#")
        ORDER BY a.created_at DESC
        "#,
        );

        Ok(query.build_query_as().fetch_all(&self.db).await?)
    }

    #[instrument(skip(self))]
    async fn list_by_author(&self, author_id: Uuid) -> StorageResult<Vec<ArticleSummary>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_COLUMNS);
        query.push(
            r#"
        FROM    articles a
        WHERE   a.deleted = false
        AND     a.author_id = "#,
        );
        query.push_bind(author_id);
        query.push(
            r#"
        ORDER BY a.created_at DESC
        "#,
        );

        Ok(query.build_query_as().fetch_all(&self.db).await?)
    }

    #[instrument(skip(self))]
    async fn detail(
        &self,
        viewer_id: Uuid,
        article_id: Uuid,
    ) -> StorageResult<Option<ArticleDetail>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_COLUMNS);
        query.push(
            r#",
                EXISTS (SELECT 1 FROM article_reactions r WHERE r.article_id = a.id AND r.reaction = 'like' AND r.user_id = "#,
        );
        query.push_bind(viewer_id);
        query.push(
            r#") AS is_liked,
                EXISTS (SELECT 1 FROM article_reactions r WHERE r.article_id = a.id AND r.reaction = 'dislike' AND r.user_id = "#,
        );
        query.push_bind(viewer_id);
        query.push(
            r#") AS is_disliked
        FROM    articles a
        WHERE   a.deleted = false
        AND     a.id = "#,
        );
        query.push_bind(article_id);

        Ok(query.build_query_as().fetch_optional(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use sqlx::{Pool, Postgres};

    use super::*;
    use crate::dao::users::PgUserStore;
    use crate::dao::UserStore;
    use crate::model::article::Reaction;
    use crate::model::user::NewUser;

    async fn author(pool: &Pool<Postgres>) -> Result<Uuid> {
        let user = PgUserStore::new(pool.clone())
            .insert(NewUser {
                first_name: "Jane".to_owned(),
                last_name: "Doe".to_owned(),
                email: "jane@example.com".to_owned(),
                phone: "9876543210".to_owned(),
                password_hash: "not a hash".to_owned(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                preference: vec!["tech".to_owned()],
            })
            .await?;

        Ok(user.id)
    }

    fn content(name: &str, category: &str) -> ArticleContent {
        ArticleContent {
            name: name.to_owned(),
            description: "description".to_owned(),
            category: vec![category.to_owned()],
            images: vec!["https://img.example/1.png".to_owned()],
        }
    }

    async fn reaction_rows(pool: &Pool<Postgres>, article_id: Uuid, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM article_reactions WHERE article_id = $1 AND user_id = $2",
        )
        .bind(article_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn like_only_applies_once(pool: Pool<Postgres>) -> Result<()> {
        let store = PgArticleStore::new(pool.clone());
        let article = store.create(author(&pool).await?, content("Rust", "tech")).await?;
        let reader = Uuid::new_v4();

        assert!(store.persist_reaction_change(article.id, reader, ReactionChange::add(Reaction::Like)).await?);
        assert!(!store.persist_reaction_change(article.id, reader, ReactionChange::add(Reaction::Like)).await?);
        // Adding a dislike next to the like is refused as well
        assert!(!store.persist_reaction_change(article.id, reader, ReactionChange::add(Reaction::Dislike)).await?);

        let stored = store.get(article.id).await?.unwrap();
        assert_eq!(stored.likes.len(), 1);
        assert!(stored.likes.contains(&reader));
        assert!(stored.dislikes.is_empty());

        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn switch_moves_the_user_between_sets(pool: Pool<Postgres>) -> Result<()> {
        let store = PgArticleStore::new(pool.clone());
        let article = store.create(author(&pool).await?, content("Rust", "tech")).await?;
        let reader = Uuid::new_v4();

        store.persist_reaction_change(article.id, reader, ReactionChange::add(Reaction::Dislike)).await?;
        assert!(store.persist_reaction_change(article.id, reader, ReactionChange::switch_to(Reaction::Like)).await?);

        let stored = store.get(article.id).await?.unwrap();
        assert!(stored.likes.contains(&reader));
        assert!(!stored.dislikes.contains(&reader));
        assert_eq!(reaction_rows(&pool, article.id, reader).await?, 1);

        // The precondition no longer holds: the user is not in dislikes anymore
        assert!(!store.persist_reaction_change(article.id, reader, ReactionChange::switch_to(Reaction::Like)).await?);
        // Nothing to switch from for a user without reaction
        assert!(!store.persist_reaction_change(article.id, Uuid::new_v4(), ReactionChange::switch_to(Reaction::Dislike)).await?);

        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn block_is_idempotent_and_keeps_reactions(pool: Pool<Postgres>) -> Result<()> {
        let store = PgArticleStore::new(pool.clone());
        let article = store.create(author(&pool).await?, content("Rust", "tech")).await?;
        let reader = Uuid::new_v4();

        store.persist_reaction_change(article.id, reader, ReactionChange::add(Reaction::Like)).await?;
        assert!(store.set_blocked(article.id, reader).await?);
        assert!(!store.set_blocked(article.id, reader).await?);

        let stored = store.get(article.id).await?.unwrap();
        assert_eq!(stored.blocks.len(), 1);
        assert!(stored.likes.contains(&reader));

        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn feed_skips_blocked_and_deleted_articles(pool: Pool<Postgres>) -> Result<()> {
        let store = PgArticleStore::new(pool.clone());
        let author_id = author(&pool).await?;
        let viewer = Uuid::new_v4();

        let older = store.create(author_id, content("Older", "tech")).await?;
        let newer = store.create(author_id, content("Newer", "tech")).await?;
        let blocked = store.create(author_id, content("Blocked", "tech")).await?;
        let deleted = store.create(author_id, content("Deleted", "tech")).await?;
        store.create(author_id, content("Elsewhere", "sport")).await?;

        sqlx::query("UPDATE articles SET created_at = now() - interval '1 hour' WHERE id = $1")
            .bind(older.id)
            .execute(&pool)
            .await?;
        store.set_blocked(blocked.id, viewer).await?;
        assert!(store.mark_deleted(deleted.id).await?);
        assert!(!store.mark_deleted(deleted.id).await?);

        let feed = store.list_preferred(viewer, &["tech".to_owned()]).await?;
        let ids: Vec<Uuid> = feed.iter().map(|article| article.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(feed[0].blocks_count, 0);

        assert!(store.list_preferred(viewer, &[]).await?.is_empty());
        assert_eq!(store.list_by_author(author_id).await?.len(), 4);

        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn detail_carries_the_viewer_reaction(pool: Pool<Postgres>) -> Result<()> {
        let store = PgArticleStore::new(pool.clone());
        let article = store.create(author(&pool).await?, content("Rust", "tech")).await?;
        let reader = Uuid::new_v4();

        store.persist_reaction_change(article.id, reader, ReactionChange::add(Reaction::Dislike)).await?;
        store.persist_reaction_change(article.id, Uuid::new_v4(), ReactionChange::add(Reaction::Like)).await?;

        let detail = store.detail(reader, article.id).await?.unwrap();
        assert!(!detail.is_liked);
        assert!(detail.is_disliked);
        assert_eq!(detail.summary.likes_count, 1);
        assert_eq!(detail.summary.dislikes_count, 1);

        store.mark_deleted(article.id).await?;
        assert!(store.detail(reader, article.id).await?.is_none());

        Ok(())
    }
}
