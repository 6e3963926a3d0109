use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{
    Article, ArticleId, Category, CategoryId, CategoryRequest, Comment, CommentId,
    CreateArticleRequest, UpdateArticleRequest, User, UserId,
};
use crate::policy::Predicate;
use crate::repository::{ListOptions, Repository};

#[derive(Default)]
struct Tables {
    // Plain-text secrets: this store only backs local runs and tests.
    users: BTreeMap<UserId, (User, String)>,
    categories: BTreeMap<CategoryId, Category>,
    articles: BTreeMap<ArticleId, Article>,
    comments: BTreeMap<CommentId, Comment>,
}

fn next_id<V>(table: &BTreeMap<i64, V>) -> i64 {
    table.keys().next_back().map_or(1, |last| last + 1)
}

impl Tables {
    fn username(&self, id: UserId) -> Option<String> {
        self.users.get(&id).map(|(user, _)| user.username.clone())
    }

    fn name_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|category| category.name == name && Some(category.id) != except)
    }

    fn parent_missing(&self, parent_id: Option<CategoryId>) -> bool {
        parent_id.is_some_and(|parent_id| !self.categories.contains_key(&parent_id))
    }
}

/// InMemoryRepository
///
/// `Repository` over in-process tables guarded by a single `RwLock`.
/// Visibility is evaluated with [`Predicate::matches`], the same predicate
/// the Postgres store translates to SQL.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Seeding ---

    pub async fn insert_user(&self, user: User, password: &str) -> User {
        let mut tables = self.tables.write().await;
        tables.users.insert(user.id, (user.clone(), password.to_string()));
        user
    }

    pub async fn insert_category(&self, category: Category) -> Category {
        let mut tables = self.tables.write().await;
        tables.categories.insert(category.id, category.clone());
        category
    }

    /// Stores the article as given, filling `author_username` from the users
    /// table when it is known.
    pub async fn insert_article(&self, mut article: Article) -> Article {
        let mut tables = self.tables.write().await;
        if let Some(username) = tables.username(article.author_id) {
            article.author_username = username;
        }
        tables.articles.insert(article.id, article.clone());
        article
    }

    pub async fn insert_comment(&self, mut comment: Comment) -> Comment {
        let mut tables = self.tables.write().await;
        if let Some(username) = tables.username(comment.author_id) {
            comment.author_username = username;
        }
        tables.comments.insert(comment.id, comment.clone());
        comment
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: UserId) -> Option<User> {
        let tables = self.tables.read().await;
        tables.users.get(&id).map(|(user, _)| user.clone())
    }

    async fn verify_credentials(&self, username: &str, password: &str) -> Option<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|(user, secret)| user.username == username && secret == password)
            .map(|(user, _)| user.clone())
    }

    async fn list_users(&self) -> Vec<User> {
        let tables = self.tables.read().await;
        tables.users.values().map(|(user, _)| user.clone()).collect()
    }

    async fn set_user_frozen(&self, id: UserId, is_frozen: bool) -> Option<User> {
        let mut tables = self.tables.write().await;
        let (user, _) = tables.users.get_mut(&id)?;
        user.is_frozen = is_frozen;
        Some(user.clone())
    }

    async fn list_categories(&self) -> Vec<Category> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        categories
    }

    async fn get_category(&self, id: CategoryId) -> Option<Category> {
        let tables = self.tables.read().await;
        tables.categories.get(&id).cloned()
    }

    async fn create_category(&self, req: CategoryRequest) -> Option<Category> {
        let mut tables = self.tables.write().await;
        if tables.name_taken(&req.name, None) || tables.parent_missing(req.parent_id) {
            tracing::debug!("create_category rejected: {:?}", req);
            return None;
        }
        let category = Category {
            id: next_id(&tables.categories),
            name: req.name,
            parent_id: req.parent_id,
        };
        tables.categories.insert(category.id, category.clone());
        Some(category)
    }

    async fn update_category(&self, id: CategoryId, req: CategoryRequest) -> Option<Category> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return None;
        }
        if tables.name_taken(&req.name, Some(id)) || tables.parent_missing(req.parent_id) {
            tracing::debug!("update_category rejected: {:?}", req);
            return None;
        }
        let category = tables.categories.get_mut(&id)?;
        category.name = req.name;
        category.parent_id = req.parent_id;
        Some(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> bool {
        let mut tables = self.tables.write().await;
        if tables.categories.remove(&id).is_none() {
            return false;
        }
        for child in tables.categories.values_mut() {
            if child.parent_id == Some(id) {
                child.parent_id = None;
            }
        }
        for article in tables.articles.values_mut() {
            if article.category_id == Some(id) {
                article.category_id = None;
            }
        }
        true
    }

    async fn list_articles(&self, predicate: &Predicate, options: &ListOptions) -> Vec<Article> {
        let tables = self.tables.read().await;
        let mut articles: Vec<Article> = tables
            .articles
            .values()
            .filter(|article| predicate.matches(article) && options.matches_search(article))
            .cloned()
            .collect();
        articles.sort_by(|a, b| options.ordering.compare(a, b));
        articles
    }

    async fn find_article(&self, id: ArticleId, predicate: &Predicate) -> Option<Article> {
        let tables = self.tables.read().await;
        tables
            .articles
            .get(&id)
            .filter(|article| predicate.matches(article))
            .cloned()
    }

    async fn create_article(&self, req: CreateArticleRequest, author_id: UserId) -> Option<Article> {
        let mut tables = self.tables.write().await;
        let author_username = tables.username(author_id)?;
        let now = Utc::now();
        let article = Article {
            id: next_id(&tables.articles),
            title: req.title,
            content: req.content,
            excerpt: req.excerpt,
            author_id,
            author_username,
            category_id: req.category_id,
            status: req.status,
            created_at: now,
            updated_at: now,
        };
        tables.articles.insert(article.id, article.clone());
        Some(article)
    }

    async fn update_article(&self, id: ArticleId, req: UpdateArticleRequest) -> Option<Article> {
        let mut tables = self.tables.write().await;
        let article = tables.articles.get_mut(&id)?;
        if let Some(title) = req.title {
            article.title = title;
        }
        if let Some(content) = req.content {
            article.content = content;
        }
        if let Some(excerpt) = req.excerpt {
            article.excerpt = excerpt;
        }
        if let Some(category_id) = req.category_id {
            article.category_id = category_id;
        }
        if let Some(status) = req.status {
            article.status = status;
        }
        article.updated_at = Utc::now();
        Some(article.clone())
    }

    async fn delete_article(&self, id: ArticleId) -> bool {
        let mut tables = self.tables.write().await;
        if tables.articles.remove(&id).is_none() {
            return false;
        }
        tables.comments.retain(|_, comment| comment.article_id != id);
        true
    }

    async fn list_comments(&self, article_id: ArticleId) -> Vec<Comment> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|comment| comment.article_id == article_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        comments
    }

    async fn get_comment(&self, id: CommentId) -> Option<Comment> {
        let tables = self.tables.read().await;
        tables.comments.get(&id).cloned()
    }

    async fn add_comment(&self, article_id: ArticleId, author_id: UserId, content: String) -> Option<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.articles.contains_key(&article_id) {
            return None;
        }
        let author_username = tables.username(author_id)?;
        let comment = Comment {
            id: next_id(&tables.comments),
            article_id,
            author_id,
            author_username,
            content,
            created_at: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Some(comment)
    }

    async fn update_comment(&self, id: CommentId, content: String) -> Option<Comment> {
        let mut tables = self.tables.write().await;
        let comment = tables.comments.get_mut(&id)?;
        comment.content = content;
        Some(comment.clone())
    }

    async fn delete_comment(&self, id: CommentId) -> bool {
        let mut tables = self.tables.write().await;
        tables.comments.remove(&id).is_some()
    }
}
