use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

pub type UserId = i64;
pub type CategoryId = i64;
pub type ArticleId = i64;
pub type CommentId = i64;

// --- Identity ---

/// Actor
///
/// The identity context of a single request. Anonymous actors carry id `0`,
/// which never matches a stored row because every ownership check goes
/// through [`Actor::authenticated_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actor {
    pub id: UserId,
    pub is_staff: bool,
    pub is_authenticated: bool,
    pub is_frozen: bool,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The actor's id, only when it denotes a real account.
    pub fn authenticated_id(&self) -> Option<UserId> {
        self.is_authenticated.then_some(self.id)
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            id: user.id,
            is_staff: user.is_staff,
            is_authenticated: true,
            is_frozen: user.is_frozen,
        }
    }
}

/// User
///
/// Account record from the `users` table. The password hash never leaves the
/// store, so it has no field here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    // Grants list-wide visibility and moderation rights.
    pub is_staff: bool,
    // Administratively frozen accounts cannot obtain new tokens.
    pub is_frozen: bool,
    #[ts(type = "string")]
    pub date_joined: DateTime<Utc>,
}

// --- Content ---

/// Category
///
/// One node of the category forest. `parent_id` is nulled (never cascaded)
/// when the parent is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

/// ArticleStatus
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "article_status", rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }
}

/// Article
///
/// Row from `articles` joined with the author's username. `author_id` is set
/// once at creation and never updated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author_id: UserId,
    // Loaded via a JOIN on `users`.
    pub author_username: String,
    pub category_id: Option<CategoryId>,
    pub status: ArticleStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// Not gated on its own: a comment is visible whenever its article is.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub author_id: UserId,
    pub author_username: String,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads ---

/// CreateArticleRequest
///
/// The author is always the requesting actor; it is not part of the payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    // Defaults to draft.
    #[serde(default)]
    pub status: ArticleStatus,
}

/// UpdateArticleRequest
///
/// Partial update; `None` fields keep their stored value. `category_id`
/// tells "absent" (`None`) apart from an explicit `null` (`Some(None)`),
/// which detaches the article from its category.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(type = "number | null")]
    #[schema(value_type = Option<i64>)]
    pub category_id: Option<Option<CategoryId>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
}

/// Wraps any present value, `null` included, in `Some`. Combined with
/// `#[serde(default)]` a missing field stays `None`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// CategoryRequest
///
/// Full-replacement payload used by both create and update.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

/// CommentRequest
///
/// Body of both comment creation and comment edits.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentRequest {
    pub content: String,
}

/// TokenRequest
///
/// Credentials for `POST /token`. Never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access: String,
    pub token_type: String,
    /// Lifetime of `access` in seconds.
    pub expires_in: u64,
}

/// CategoryRef
///
/// Compact `{id, name}` pair used to describe a category's parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
}

/// CategoryDetails
///
/// A category enriched from the tree snapshot: its parent, its full
/// `Root -> ... -> Leaf` path and the number of direct children.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoryDetails {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub parent: Option<CategoryRef>,
    pub path: String,
    pub children_count: usize,
}
