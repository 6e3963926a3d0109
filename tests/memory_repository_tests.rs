mod common;

use article_cms::{
    models::{Actor, ArticleStatus, CategoryRequest, CreateArticleRequest, UpdateArticleRequest},
    policy::{ArticleFilter, Predicate, StatusScope, build_single_resource_predicate},
    repository::{ArticleOrdering, ListOptions, Repository, like_pattern},
};
use common::{
    ALICE, ALICE_DRAFT, ALICE_PUBLISHED, BOB, BOB_DRAFT, BOB_PUBLISHED, LIFE, PROGRAMMING, PYTHON, STAFF_PUBLISHED, TECH,
    member, seeded_repo,
};

fn everything() -> Predicate {
    Predicate::Filter(ArticleFilter::with_status(StatusScope::Any))
}

#[tokio::test]
async fn test_verify_credentials() {
    let repo = seeded_repo().await;

    assert_eq!(repo.verify_credentials("alice", "alice-pass").await.map(|u| u.id), Some(ALICE));
    assert!(repo.verify_credentials("alice", "bob-pass").await.is_none());
    assert!(repo.verify_credentials("mallory", "alice-pass").await.is_none());
}

#[tokio::test]
async fn test_nothing_predicate_returns_no_rows() {
    let repo = seeded_repo().await;

    assert!(repo.list_articles(&Predicate::Nothing, &ListOptions::default()).await.is_empty());
    assert!(repo.find_article(ALICE_PUBLISHED, &Predicate::Nothing).await.is_none());
}

#[tokio::test]
async fn test_search_covers_title_content_and_excerpt() {
    let repo = seeded_repo().await;
    repo.update_article(
        BOB_PUBLISHED,
        UpdateArticleRequest {
            excerpt: Some("A quick SOURDOUGH guide".to_string()),
            ..UpdateArticleRequest::default()
        },
    )
    .await
    .unwrap();

    let search = |term: &str| ListOptions {
        search: Some(term.to_string()),
        ..ListOptions::default()
    };

    let by_excerpt = repo.list_articles(&everything(), &search("sourdough")).await;
    assert_eq!(by_excerpt.iter().map(|a| a.id).collect::<Vec<_>>(), vec![BOB_PUBLISHED]);

    // Content of every fixture ends in "body".
    assert_eq!(repo.list_articles(&everything(), &search("BODY")).await.len(), 5);
    assert!(repo.list_articles(&everything(), &search("kubernetes")).await.is_empty());
}

#[tokio::test]
async fn test_ordering_breaks_ties_by_id() {
    let repo = seeded_repo().await;
    for id in [ALICE_PUBLISHED, BOB_PUBLISHED] {
        repo.update_article(
            id,
            UpdateArticleRequest {
                title: Some("Same".to_string()),
                ..UpdateArticleRequest::default()
            },
        )
        .await
        .unwrap();
    }

    let ascending = ListOptions {
        ordering: ArticleOrdering::parse(Some("title")),
        ..ListOptions::default()
    };
    let listed: Vec<_> = repo
        .list_articles(&everything(), &ascending)
        .await
        .into_iter()
        .map(|a| a.id)
        .collect();
    // "Compiler notes" < "Same" (twice) < "Site news" < "Unfinished essay"
    assert_eq!(listed, vec![ALICE_DRAFT, ALICE_PUBLISHED, BOB_PUBLISHED, STAFF_PUBLISHED, BOB_DRAFT]);
}

#[tokio::test]
async fn test_update_never_changes_author() {
    let repo = seeded_repo().await;

    let updated = repo
        .update_article(
            ALICE_PUBLISHED,
            UpdateArticleRequest {
                status: Some(ArticleStatus::Draft),
                category_id: Some(Some(LIFE)),
                ..UpdateArticleRequest::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.author_id, ALICE);
    assert_eq!(updated.status, ArticleStatus::Draft);
    assert_eq!(updated.category_id, Some(LIFE));
    assert!(updated.updated_at > updated.created_at);
    assert!(repo.update_article(999, UpdateArticleRequest::default()).await.is_none());
}

#[tokio::test]
async fn test_update_clears_category_only_when_null_is_sent() {
    let repo = seeded_repo().await;

    let untouched = repo
        .update_article(ALICE_PUBLISHED, UpdateArticleRequest::default())
        .await
        .unwrap();
    assert_eq!(untouched.category_id, Some(PYTHON));

    let cleared = repo
        .update_article(
            ALICE_PUBLISHED,
            UpdateArticleRequest {
                category_id: Some(None),
                ..UpdateArticleRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.category_id, None);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let repo = seeded_repo().await;
    repo.update_article(
        BOB_PUBLISHED,
        UpdateArticleRequest {
            title: Some("100% rye".to_string()),
            ..UpdateArticleRequest::default()
        },
    )
    .await
    .unwrap();

    let search = |term: &str| ListOptions {
        search: Some(term.to_string()),
        ..ListOptions::default()
    };

    let percent = repo.list_articles(&everything(), &search("%")).await;
    assert_eq!(percent.iter().map(|a| a.id).collect::<Vec<_>>(), vec![BOB_PUBLISHED]);
    assert!(repo.list_articles(&everything(), &search("_")).await.is_empty());
}

#[test]
fn test_like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("rust"), "%rust%");
    assert_eq!(like_pattern(r#"100%_a\"#), r#"%100\%\_a\\%"#);
}

#[tokio::test]
async fn test_create_article_for_unknown_author_fails() {
    let repo = seeded_repo().await;
    let req = CreateArticleRequest {
        title: "Ghost".to_string(),
        content: "Boo".to_string(),
        ..CreateArticleRequest::default()
    };

    assert!(repo.create_article(req.clone(), 4242).await.is_none());

    let created = repo.create_article(req, BOB).await.unwrap();
    assert_eq!(created.id, 6);
    assert_eq!(created.author_username, "bob");
}

#[tokio::test]
async fn test_category_constraints() {
    let repo = seeded_repo().await;

    let duplicate = CategoryRequest {
        name: "Tech".to_string(),
        parent_id: None,
    };
    assert!(repo.create_category(duplicate.clone()).await.is_none());
    assert!(repo.update_category(LIFE, duplicate).await.is_none());

    let orphan = CategoryRequest {
        name: "Orphan".to_string(),
        parent_id: Some(999),
    };
    assert!(repo.create_category(orphan).await.is_none());

    // Renaming to its own name is not a duplicate.
    let same = CategoryRequest {
        name: "Tech".to_string(),
        parent_id: None,
    };
    assert!(repo.update_category(TECH, same).await.is_some());
}

#[tokio::test]
async fn test_delete_category_nulls_references() {
    let repo = seeded_repo().await;

    assert!(repo.delete_category(PROGRAMMING).await);
    assert!(!repo.delete_category(PROGRAMMING).await);

    assert_eq!(repo.get_category(PYTHON).await.unwrap().parent_id, None);
    let owner = build_single_resource_predicate(&member(ALICE));
    assert_eq!(repo.find_article(ALICE_DRAFT, &owner).await.unwrap().category_id, None);
    // Articles of other categories are untouched.
    assert_eq!(
        repo.find_article(ALICE_PUBLISHED, &owner).await.unwrap().category_id,
        Some(PYTHON)
    );
    assert_eq!(repo.list_categories().await.len(), 3);
}

#[tokio::test]
async fn test_comments_are_listed_oldest_first() {
    let repo = seeded_repo().await;

    let added = repo
        .add_comment(ALICE_PUBLISHED, ALICE, "Thanks!".to_string())
        .await
        .unwrap();
    let comments = repo.list_comments(ALICE_PUBLISHED).await;

    assert_eq!(comments.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, added.id]);
    assert!(repo.add_comment(999, ALICE, "Nowhere".to_string()).await.is_none());

    let anonymous = build_single_resource_predicate(&Actor::anonymous());
    assert!(repo.find_article(STAFF_PUBLISHED, &anonymous).await.is_some());
}

#[tokio::test]
async fn test_update_comment_keeps_author_and_article() {
    let repo = seeded_repo().await;

    let edited = repo.update_comment(1, "Great tips".to_string()).await.unwrap();
    assert_eq!(edited.content, "Great tips");
    assert_eq!(edited.author_id, BOB);
    assert_eq!(edited.article_id, ALICE_PUBLISHED);
    assert_eq!(repo.get_comment(1).await.unwrap().content, "Great tips");

    assert!(repo.update_comment(999, "Nowhere".to_string()).await.is_none());
}
