use std::collections::HashSet;

use serde::Deserialize;

use crate::models::{Actor, Article, ArticleStatus, CategoryId, UserId};
use crate::policy::category_tree::{CategorySource, descendant_closure};

/// Value of the `author` parameter that means "the requesting actor".
pub const AUTHOR_ME: &str = "me";

/// ListParams
///
/// Raw visibility-relevant query parameters of an article listing. Values
/// stay strings so malformed input can be ignored instead of rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
}

impl ListParams {
    /// The category filter, if it parses as an id. Anything else counts as
    /// absent.
    pub fn category_id(&self) -> Option<CategoryId> {
        self.category.as_deref()?.trim().parse().ok()
    }
}

/// StatusScope
///
/// The status axis of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusScope {
    Any,
    Published,
    /// Drafts written by this author only.
    DraftsOf(UserId),
    /// Everything published, plus this author's drafts.
    PublishedOrDraftsOf(UserId),
}

impl StatusScope {
    pub fn matches(&self, article: &Article) -> bool {
        match self {
            StatusScope::Any => true,
            StatusScope::Published => article.status == ArticleStatus::Published,
            StatusScope::DraftsOf(author_id) => {
                article.status == ArticleStatus::Draft && article.author_id == *author_id
            }
            StatusScope::PublishedOrDraftsOf(author_id) => {
                article.status == ArticleStatus::Published || article.author_id == *author_id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorScope {
    Id(UserId),
    Username(String),
}

/// ArticleFilter
///
/// Conjunction of the three axes. `None` on an axis means unrestricted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFilter {
    pub status: StatusScope,
    pub author: Option<AuthorScope>,
    pub categories: Option<HashSet<CategoryId>>,
}

impl ArticleFilter {
    pub fn with_status(status: StatusScope) -> Self {
        Self {
            status,
            author: None,
            categories: None,
        }
    }

    pub fn matches(&self, article: &Article) -> bool {
        if !self.status.matches(article) {
            return false;
        }

        let author_ok = match &self.author {
            None => true,
            Some(AuthorScope::Id(id)) => article.author_id == *id,
            Some(AuthorScope::Username(name)) => article.author_username == *name,
        };

        let category_ok = match &self.categories {
            None => true,
            Some(closure) => article
                .category_id
                .is_some_and(|category_id| closure.contains(&category_id)),
        };

        author_ok && category_ok
    }
}

/// Predicate
///
/// Which article rows a request may see. The store applies it; nothing in
/// this module reads storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches no row at all.
    Nothing,
    Filter(ArticleFilter),
}

impl Predicate {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Predicate::Nothing)
    }

    pub fn matches(&self, article: &Article) -> bool {
        match self {
            Predicate::Nothing => false,
            Predicate::Filter(filter) => filter.matches(article),
        }
    }
}

/// build_list_predicate
///
/// Read predicate for an article listing. Rules are applied in a fixed
/// order and the first status rule that applies wins:
///
/// 1. `status=draft`: anonymous sees nothing, everyone else (staff included)
///    sees only their own drafts.
/// 2. `status=published`: published only.
/// 3. any other or missing status, non-staff: published only.
/// 4. any other or missing status, staff: every status.
///
/// `author=me` then pins the author to the actor and returns straight away,
/// skipping the category filter. Otherwise a parseable `category` is
/// expanded to its descendant closure; an unknown category matches nothing.
pub fn build_list_predicate<S>(actor: &Actor, params: &ListParams, categories: &S) -> Predicate
where
    S: CategorySource + ?Sized,
{
    let status = match params.status.as_deref() {
        Some("draft") => match actor.authenticated_id() {
            Some(id) => StatusScope::DraftsOf(id),
            None => {
                tracing::debug!("anonymous draft listing denied");
                return Predicate::Nothing;
            }
        },
        Some("published") => StatusScope::Published,
        _ if actor.is_staff => StatusScope::Any,
        _ => StatusScope::Published,
    };

    let mut filter = ArticleFilter::with_status(status);

    match params.author.as_deref() {
        Some(AUTHOR_ME) => {
            // "me" has no referent for an anonymous actor.
            let Some(id) = actor.authenticated_id() else {
                return Predicate::Nothing;
            };
            filter.author = Some(AuthorScope::Id(id));
            return Predicate::Filter(filter);
        }
        Some(username) if !username.trim().is_empty() => {
            filter.author = Some(AuthorScope::Username(username.trim().to_string()));
        }
        _ => {}
    }

    if let Some(category_id) = params.category_id() {
        let closure = descendant_closure(categories, category_id);
        if closure.is_empty() {
            tracing::debug!(category_id, "unknown category filter, matching nothing");
            return Predicate::Nothing;
        }
        filter.categories = Some(closure);
    }

    Predicate::Filter(filter)
}

/// build_single_resource_predicate
///
/// Predicate for fetching, updating or deleting one article by id: published
/// articles plus the actor's own drafts. Staff get no bypass here.
pub fn build_single_resource_predicate(actor: &Actor) -> Predicate {
    let status = match actor.authenticated_id() {
        Some(id) => StatusScope::PublishedOrDraftsOf(id),
        None => StatusScope::Published,
    };
    Predicate::Filter(ArticleFilter::with_status(status))
}
