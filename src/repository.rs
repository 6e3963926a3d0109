use crate::models::{
    Article, ArticleId, ArticleStatus, Category, CategoryId, CategoryRequest, Comment, CommentId,
    CreateArticleRequest, UpdateArticleRequest, User, UserId,
};
use crate::policy::{AuthorScope, Predicate, StatusScope};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::cmp::Ordering;
use std::sync::Arc;

// --- Listing Options ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    CreatedAt,
    UpdatedAt,
    Title,
}

impl OrderField {
    fn column(&self) -> &'static str {
        match self {
            OrderField::CreatedAt => "a.created_at",
            OrderField::UpdatedAt => "a.updated_at",
            OrderField::Title => "a.title",
        }
    }
}

/// ArticleOrdering
///
/// Sort order for listings. Parsed from `created_at`, `updated_at` or
/// `title`, with a leading `-` for descending. Unknown values fall back to
/// newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleOrdering {
    pub field: OrderField,
    pub descending: bool,
}

impl Default for ArticleOrdering {
    fn default() -> Self {
        Self {
            field: OrderField::CreatedAt,
            descending: true,
        }
    }
}

impl ArticleOrdering {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return Self::default();
        };
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "created_at" => OrderField::CreatedAt,
            "updated_at" => OrderField::UpdatedAt,
            "title" => OrderField::Title,
            _ => return Self::default(),
        };
        Self { field, descending }
    }

    pub fn compare(&self, a: &Article, b: &Article) -> Ordering {
        let ordering = match self.field {
            OrderField::CreatedAt => a.created_at.cmp(&b.created_at),
            OrderField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            OrderField::Title => a.title.cmp(&b.title),
        }
        // Stable tie-break so equal timestamps still list deterministically.
        .then_with(|| a.id.cmp(&b.id));

        if self.descending { ordering.reverse() } else { ordering }
    }
}

/// ListOptions
///
/// Presentation concerns of a listing, independent of visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Case-insensitive substring over title, content and excerpt.
    pub search: Option<String>,
    pub ordering: ArticleOrdering,
}

impl ListOptions {
    pub fn matches_search(&self, article: &Article) -> bool {
        let Some(term) = self.search.as_deref() else {
            return true;
        };
        let term = term.to_lowercase();
        [&article.title, &article.content, &article.excerpt]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// like_pattern
///
/// `%term%` for `ILIKE ... ESCAPE '\'`, with the term's own wildcards
/// escaped so it matches literally, like [`ListOptions::matches_search`].
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Repository Trait
///
/// Abstract contract for persistence. Handlers never see SQL; visibility
/// arrives as a [`Predicate`] computed by the policy layer, and the store
/// only has to apply it.
///
/// Failures are logged by the implementation and surface as `None`, an empty
/// `Vec` or `false`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: UserId) -> Option<User>;
    // Returns the user only when the password matches.
    async fn verify_credentials(&self, username: &str, password: &str) -> Option<User>;
    async fn list_users(&self) -> Vec<User>;
    async fn set_user_frozen(&self, id: UserId, is_frozen: bool) -> Option<User>;

    // --- Categories ---
    // Whole-forest snapshot for building a CategoryTree.
    async fn list_categories(&self) -> Vec<Category>;
    async fn get_category(&self, id: CategoryId) -> Option<Category>;
    // None on failure, typically a duplicate name.
    async fn create_category(&self, req: CategoryRequest) -> Option<Category>;
    async fn update_category(&self, id: CategoryId, req: CategoryRequest) -> Option<Category>;
    // Children and articles of the deleted category lose their reference.
    async fn delete_category(&self, id: CategoryId) -> bool;

    // --- Articles ---
    async fn list_articles(&self, predicate: &Predicate, options: &ListOptions) -> Vec<Article>;
    async fn find_article(&self, id: ArticleId, predicate: &Predicate) -> Option<Article>;
    async fn create_article(&self, req: CreateArticleRequest, author_id: UserId) -> Option<Article>;
    // Never touches author_id.
    async fn update_article(&self, id: ArticleId, req: UpdateArticleRequest) -> Option<Article>;
    async fn delete_article(&self, id: ArticleId) -> bool;

    // --- Comments ---
    async fn list_comments(&self, article_id: ArticleId) -> Vec<Comment>;
    async fn get_comment(&self, id: CommentId) -> Option<Comment>;
    async fn add_comment(&self, article_id: ArticleId, author_id: UserId, content: String) -> Option<Comment>;
    // Never touches author_id or article_id.
    async fn update_comment(&self, id: CommentId, content: String) -> Option<Comment>;
    async fn delete_comment(&self, id: CommentId) -> bool;
}

/// RepositoryState
///
/// Shared handle to the persistence layer held in the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

const USER_COLUMNS: &str = "id, username, email, is_staff, is_frozen, date_joined";

const ARTICLE_SELECT: &str = r#"
    SELECT
        a.id, a.title, a.content, a.excerpt, a.author_id,
        u.username AS author_username,
        a.category_id, a.status, a.created_at, a.updated_at
    FROM articles a
    JOIN users u ON u.id = a.author_id
    WHERE TRUE
"#;

/// push_predicate
///
/// Appends the predicate as `AND ...` clauses. Every value is bound; only
/// fixed column names are pushed as text.
fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    let filter = match predicate {
        Predicate::Nothing => {
            builder.push(" AND FALSE");
            return;
        }
        Predicate::Filter(filter) => filter,
    };

    match &filter.status {
        StatusScope::Any => {}
        StatusScope::Published => {
            builder.push(" AND a.status = ");
            builder.push_bind(ArticleStatus::Published);
        }
        StatusScope::DraftsOf(author_id) => {
            builder.push(" AND a.status = ");
            builder.push_bind(ArticleStatus::Draft);
            builder.push(" AND a.author_id = ");
            builder.push_bind(*author_id);
        }
        StatusScope::PublishedOrDraftsOf(author_id) => {
            builder.push(" AND (a.status = ");
            builder.push_bind(ArticleStatus::Published);
            builder.push(" OR a.author_id = ");
            builder.push_bind(*author_id);
            builder.push(")");
        }
    }

    match &filter.author {
        None => {}
        Some(AuthorScope::Id(author_id)) => {
            builder.push(" AND a.author_id = ");
            builder.push_bind(*author_id);
        }
        Some(AuthorScope::Username(username)) => {
            builder.push(" AND u.username = ");
            builder.push_bind(username.clone());
        }
    }

    if let Some(closure) = &filter.categories {
        let ids: Vec<CategoryId> = closure.iter().copied().collect();
        builder.push(" AND a.category_id = ANY(");
        builder.push_bind(ids);
        builder.push(")");
    }
}

/// PostgresRepository
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_article(&self, id: ArticleId) -> Option<Article> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(ARTICLE_SELECT);
        builder.push(" AND a.id = ");
        builder.push_bind(id);
        builder
            .build_query_as::<Article>()
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("fetch_article error: {:?}", e);
                None
            })
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: UserId) -> Option<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// verify_credentials
    ///
    /// The hash comparison runs inside Postgres (pgcrypto `crypt`), so the
    /// stored hash is never loaded into the service.
    async fn verify_credentials(&self, username: &str, password: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND password_hash = crypt($2, password_hash)"
        ))
        .bind(username)
        .bind(password)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("verify_credentials error: {:?}", e);
            None
        })
    }

    async fn list_users(&self) -> Vec<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            })
    }

    async fn set_user_frozen(&self, id: UserId, is_frozen: bool) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_frozen = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(is_frozen)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_user_frozen error: {:?}", e);
            None
        })
    }

    async fn list_categories(&self) -> Vec<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name, parent_id FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("list_categories error: {:?}", e);
                vec![]
            })
    }

    async fn get_category(&self, id: CategoryId) -> Option<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name, parent_id FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_category error: {:?}", e);
                None
            })
    }

    async fn create_category(&self, req: CategoryRequest) -> Option<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, parent_id) VALUES ($1, $2) RETURNING id, name, parent_id",
        )
        .bind(req.name)
        .bind(req.parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("create_category error: {:?}", e))
        .ok()
    }

    async fn update_category(&self, id: CategoryId, req: CategoryRequest) -> Option<Category> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2, parent_id = $3 WHERE id = $1 RETURNING id, name, parent_id",
        )
        .bind(id)
        .bind(req.name)
        .bind(req.parent_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_category error: {:?}", e);
            None
        })
    }

    /// delete_category
    ///
    /// `ON DELETE SET NULL` on `categories.parent_id` and
    /// `articles.category_id` detaches children and articles.
    async fn delete_category(&self, id: CategoryId) -> bool {
        match sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_category error: {:?}", e);
                false
            }
        }
    }

    async fn list_articles(&self, predicate: &Predicate, options: &ListOptions) -> Vec<Article> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(ARTICLE_SELECT);
        push_predicate(&mut builder, predicate);

        if let Some(search) = &options.search {
            let pattern = like_pattern(search);
            builder.push(" AND (a.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(r" ESCAPE '\' OR a.content ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(r" ESCAPE '\' OR a.excerpt ILIKE ");
            builder.push_bind(pattern);
            builder.push(r" ESCAPE '\')");
        }

        let direction = if options.ordering.descending { "DESC" } else { "ASC" };
        builder.push(format!(
            " ORDER BY {} {direction}, a.id {direction}",
            options.ordering.field.column()
        ));

        match builder.build_query_as::<Article>().fetch_all(&self.pool).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::error!("list_articles error: {:?}", e);
                vec![]
            }
        }
    }

    async fn find_article(&self, id: ArticleId, predicate: &Predicate) -> Option<Article> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(ARTICLE_SELECT);
        builder.push(" AND a.id = ");
        builder.push_bind(id);
        push_predicate(&mut builder, predicate);

        builder
            .build_query_as::<Article>()
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("find_article error: {:?}", e);
                None
            })
    }

    async fn create_article(&self, req: CreateArticleRequest, author_id: UserId) -> Option<Article> {
        let inserted = sqlx::query_scalar::<_, ArticleId>(
            r#"
            INSERT INTO articles (title, content, excerpt, author_id, category_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING id
            "#,
        )
        .bind(req.title)
        .bind(req.content)
        .bind(req.excerpt)
        .bind(author_id)
        .bind(req.category_id)
        .bind(req.status)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(id) => self.fetch_article(id).await,
            Err(e) => {
                tracing::error!("create_article error: {:?}", e);
                None
            }
        }
    }

    /// update_article
    ///
    /// `COALESCE` keeps the stored value for every field left as `None`.
    /// `category_id` may be cleared, so it carries a separate "present" flag.
    async fn update_article(&self, id: ArticleId, req: UpdateArticleRequest) -> Option<Article> {
        let updated = sqlx::query_scalar::<_, ArticleId>(
            r#"
            UPDATE articles
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                excerpt = COALESCE($4, excerpt),
                category_id = CASE WHEN $5 THEN $6 ELSE category_id END,
                status = COALESCE($7, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(req.title)
        .bind(req.content)
        .bind(req.excerpt)
        .bind(req.category_id.is_some())
        .bind(req.category_id.flatten())
        .bind(req.status)
        .fetch_optional(&self.pool)
        .await;

        match updated {
            Ok(Some(id)) => self.fetch_article(id).await,
            Ok(None) => None,
            Err(e) => {
                tracing::error!("update_article error: {:?}", e);
                None
            }
        }
    }

    async fn delete_article(&self, id: ArticleId) -> bool {
        match sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_article error: {:?}", e);
                false
            }
        }
    }

    async fn list_comments(&self, article_id: ArticleId) -> Vec<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.article_id, c.author_id, u.username AS author_username, c.content, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.article_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_comments error: {:?}", e);
            vec![]
        })
    }

    async fn get_comment(&self, id: CommentId) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.article_id, c.author_id, u.username AS author_username, c.content, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_comment error: {:?}", e);
            None
        })
    }

    async fn add_comment(&self, article_id: ArticleId, author_id: UserId, content: String) -> Option<Comment> {
        // Insert and join the author's username in one round trip.
        sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (article_id, author_id, content, created_at)
                VALUES ($1, $2, $3, NOW())
                RETURNING id, article_id, author_id, content, created_at
            )
            SELECT i.id, i.article_id, i.author_id, u.username AS author_username, i.content, i.created_at
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(article_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("add_comment error: {:?}", e))
        .ok()
    }

    async fn update_comment(&self, id: CommentId, content: String) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET content = $2
                WHERE id = $1
                RETURNING id, article_id, author_id, content, created_at
            )
            SELECT d.id, d.article_id, d.author_id, u.username AS author_username, d.content, d.created_at
            FROM updated d JOIN users u ON u.id = d.author_id
            "#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_comment error: {:?}", e);
            None
        })
    }

    async fn delete_comment(&self, id: CommentId) -> bool {
        match sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_comment error: {:?}", e);
                false
            }
        }
    }
}
