#![allow(dead_code)]

use article_cms::{
    AppConfig, AppState, InMemoryRepository,
    models::{Actor, Article, ArticleStatus, Category, CategoryId, Comment, User, UserId},
    repository::RepositoryState,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

// --- Fixture ids ---

pub const ALICE: UserId = 7;
pub const BOB: UserId = 8;
pub const STAFF: UserId = 9;
pub const FROZEN: UserId = 10;

pub const TECH: CategoryId = 1;
pub const PROGRAMMING: CategoryId = 2;
pub const PYTHON: CategoryId = 3;
pub const LIFE: CategoryId = 4;

pub const ALICE_PUBLISHED: i64 = 1;
pub const ALICE_DRAFT: i64 = 2;
pub const BOB_PUBLISHED: i64 = 3;
pub const BOB_DRAFT: i64 = 4;
pub const STAFF_PUBLISHED: i64 = 5;

pub fn member(id: UserId) -> Actor {
    Actor {
        id,
        is_staff: false,
        is_authenticated: true,
        is_frozen: false,
    }
}

pub fn staff(id: UserId) -> Actor {
    Actor {
        is_staff: true,
        ..member(id)
    }
}

pub fn at(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
}

pub fn category(id: CategoryId, name: &str, parent_id: Option<CategoryId>) -> Category {
    Category {
        id,
        name: name.to_string(),
        parent_id,
    }
}

/// Tech(1) -> Programming(2) -> Python(3), plus a separate root Life(4).
pub fn categories() -> Vec<Category> {
    vec![
        category(TECH, "Tech", None),
        category(PROGRAMMING, "Programming", Some(TECH)),
        category(PYTHON, "Python", Some(PROGRAMMING)),
        category(LIFE, "Life", None),
    ]
}

pub fn article(
    id: i64,
    author_id: UserId,
    status: ArticleStatus,
    category_id: Option<CategoryId>,
    title: &str,
) -> Article {
    Article {
        id,
        title: title.to_string(),
        content: format!("{title} body"),
        excerpt: String::new(),
        author_id,
        author_username: String::new(),
        category_id,
        status,
        created_at: at(id),
        updated_at: at(id),
    }
}

pub fn articles() -> Vec<Article> {
    vec![
        article(ALICE_PUBLISHED, ALICE, ArticleStatus::Published, Some(PYTHON), "Python tips"),
        article(ALICE_DRAFT, ALICE, ArticleStatus::Draft, Some(PROGRAMMING), "Compiler notes"),
        article(BOB_PUBLISHED, BOB, ArticleStatus::Published, Some(LIFE), "Weekend cooking"),
        article(BOB_DRAFT, BOB, ArticleStatus::Draft, None, "Unfinished essay"),
        article(STAFF_PUBLISHED, STAFF, ArticleStatus::Published, Some(TECH), "Site news"),
    ]
}

fn user(id: UserId, username: &str, is_staff: bool, is_frozen: bool) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        is_staff,
        is_frozen,
        date_joined: at(0),
    }
}

pub async fn seeded_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new();

    repo.insert_user(user(ALICE, "alice", false, false), "alice-pass").await;
    repo.insert_user(user(BOB, "bob", false, false), "bob-pass").await;
    repo.insert_user(user(STAFF, "editor", true, false), "editor-pass").await;
    repo.insert_user(user(FROZEN, "frost", false, true), "frost-pass").await;

    for category in categories() {
        repo.insert_category(category).await;
    }
    for article in articles() {
        repo.insert_article(article).await;
    }

    repo.insert_comment(Comment {
        id: 1,
        article_id: ALICE_PUBLISHED,
        author_id: BOB,
        author_username: String::new(),
        content: "Nice tips".to_string(),
        created_at: at(10),
    })
    .await;
    repo.insert_comment(Comment {
        id: 2,
        article_id: ALICE_DRAFT,
        author_id: ALICE,
        author_username: String::new(),
        content: "Note to self".to_string(),
        created_at: at(11),
    })
    .await;

    repo
}

pub async fn seeded_state() -> AppState {
    AppState {
        repo: Arc::new(seeded_repo().await) as RepositoryState,
        config: AppConfig::default(),
    }
}
