use std::collections::HashSet;

use speculoos::prelude::*;
use uuid::Uuid;

use article_feed::dao::ArticleStore;
use article_feed::errors::{ArticleError, StorageError};
use article_feed::model::article::{Article, Reaction};
use helpers::{content, TestContext};

mod helpers;

async fn stored(context: &TestContext, article_id: Uuid) -> Article {
    context.articles.get(article_id).await.unwrap().unwrap()
}

#[tokio::test]
async fn liking_a_disliked_article_moves_the_user() {
    let context = TestContext::new();
    let author = context.user(&["tech"]).await;
    let user_2 = Uuid::new_v4();

    let mut article = Article::new(author.id, content("Switch", &["tech"]));
    article.dislikes.insert(user_2);
    let article = context.insert(article).await;

    context
        .state
        .reaction_service
        .react(user_2, article.id, Reaction::Like)
        .await
        .unwrap();

    let article = stored(&context, article.id).await;
    assert_that(&article.likes).is_equal_to(HashSet::from([user_2]));
    assert_that(&article.dislikes.len()).is_equal_to(0);
}

#[tokio::test]
async fn liking_twice_is_refused_and_changes_nothing() {
    let context = TestContext::new();
    let author = context.user(&["tech"]).await;
    let user_1 = Uuid::new_v4();

    let mut article = Article::new(author.id, content("Twice", &["tech"]));
    article.likes.insert(user_1);
    let article = context.insert(article).await;

    let result = context
        .state
        .reaction_service
        .react(user_1, article.id, Reaction::Like)
        .await;

    assert!(matches!(
        result,
        Err(ArticleError::AlreadyReacted(Reaction::Like))
    ));
    let after = stored(&context, article.id).await;
    assert_that(&after.likes).is_equal_to(HashSet::from([user_1]));
    assert_that(&after.dislikes.len()).is_equal_to(0);
}

#[tokio::test]
async fn first_reaction_is_added() {
    let context = TestContext::new();
    let author = context.user(&["tech"]).await;
    let article = context.article(&author, &["tech"], 0).await;
    let user = Uuid::new_v4();

    context
        .state
        .reaction_service
        .react(user, article.id, Reaction::Dislike)
        .await
        .unwrap();

    let article = stored(&context, article.id).await;
    assert!(article.dislikes.contains(&user));
    assert_that(&article.likes.len()).is_equal_to(0);
}

#[tokio::test]
async fn blocking_is_idempotent_and_leaves_reactions_alone() {
    let context = TestContext::new();
    let author = context.user(&["tech"]).await;
    let user = Uuid::new_v4();

    let mut article = Article::new(author.id, content("Block", &["tech"]));
    article.likes.insert(user);
    let article = context.insert(article).await;

    let reactions = &context.state.reaction_service;
    reactions.block(user, article.id).await.unwrap();
    assert_that(&stored(&context, article.id).await.blocks.len()).is_equal_to(1);

    reactions.block(user, article.id).await.unwrap();
    let article = stored(&context, article.id).await;
    assert_that(&article.blocks.len()).is_equal_to(1);
    assert_that(&article.likes).is_equal_to(HashSet::from([user]));
    assert_that(&article.dislikes.len()).is_equal_to(0);
}

#[tokio::test]
async fn reacting_to_missing_or_deleted_articles_fails() {
    let context = TestContext::new();
    let author = context.user(&["tech"]).await;
    let article = context.article(&author, &["tech"], 0).await;
    context
        .state
        .article_service
        .delete(author.id, article.id)
        .await
        .unwrap();

    let reactions = &context.state.reaction_service;
    let user = Uuid::new_v4();

    assert!(matches!(
        reactions.react(user, Uuid::new_v4(), Reaction::Like).await,
        Err(ArticleError::NotFound)
    ));
    assert!(matches!(
        reactions.react(user, article.id, Reaction::Like).await,
        Err(ArticleError::NotFound)
    ));
    assert!(matches!(
        reactions.block(user, article.id).await,
        Err(ArticleError::NotFound)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_switches_never_leave_a_user_in_both_sets() {
    let context = TestContext::new();
    let author = context.user(&["tech"]).await;
    let article_id = context.article(&author, &["tech"], 0).await.id;
    let user = Uuid::new_v4();

    let mut handles = Vec::new();
    for i in 0..50 {
        let reactions = context.state.reaction_service.clone();
        let reaction = if i % 2 == 0 {
            Reaction::Like
        } else {
            Reaction::Dislike
        };
        handles.push(tokio::spawn(async move {
            reactions.react(user, article_id, reaction).await
        }));
    }

    for handle in handles {
        match handle.await.unwrap() {
            Ok(())
            | Err(ArticleError::AlreadyReacted(_))
            | Err(ArticleError::Storage(StorageError::Contended)) => {}
            Err(e) => panic!("Unexpected error {e}"),
        }
    }

    let article = stored(&context, article_id).await;
    let in_likes = article.likes.contains(&user);
    let in_dislikes = article.dislikes.contains(&user);
    assert!(in_likes ^ in_dislikes, "User must be in exactly one set");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_likes_of_different_users_are_all_kept() {
    let context = TestContext::new();
    let author = context.user(&["tech"]).await;
    let article_id = context.article(&author, &["tech"], 0).await.id;

    let users: Vec<Uuid> = (0..20).map(|_| Uuid::new_v4()).collect();
    let mut handles = Vec::new();
    for user in users.iter().copied() {
        let reactions = context.state.reaction_service.clone();
        handles.push(tokio::spawn(async move {
            reactions.react(user, article_id, Reaction::Like).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let article = stored(&context, article_id).await;
    assert_that(&article.likes).is_equal_to(users.into_iter().collect::<HashSet<_>>());
}
