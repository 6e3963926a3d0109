use crate::{
    AppState,
    auth::{AuthUser, TokenError, issue_token},
    models::{
        Actor, Article, ArticleId, CategoryDetails, CategoryId, CategoryRequest, Comment, CommentId,
        CreateArticleRequest, CommentRequest, TokenRequest, TokenResponse,
        UpdateArticleRequest, User, UserId,
    },
    policy::{
        CategoryTree, ListParams, build_list_predicate, build_single_resource_predicate,
        can_mutate_category, can_mutate_resource,
    },
    repository::{ArticleOrdering, ListOptions},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

// --- Query Structs ---

/// ArticleQuery
///
/// Query parameters of `GET /articles`. Everything is read as a string;
/// unparseable values are ignored rather than rejected.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ArticleQuery {
    /// `draft` or `published`.
    pub status: Option<String>,
    /// Category id; articles of every descendant category are included.
    pub category: Option<String>,
    /// `me` or a username.
    pub author: Option<String>,
    /// Case-insensitive match on title, content and excerpt.
    pub search: Option<String>,
    /// `created_at`, `updated_at` or `title`, `-` prefix for descending.
    pub ordering: Option<String>,
}

impl ArticleQuery {
    pub fn split(self) -> (ListParams, ListOptions) {
        let options = ListOptions {
            search: self.search.filter(|term| !term.trim().is_empty()),
            ordering: ArticleOrdering::parse(self.ordering.as_deref()),
        };
        let params = ListParams {
            status: self.status,
            category: self.category,
            author: self.author,
        };
        (params, options)
    }
}

/// Loads the category forest as one snapshot for this request.
async fn category_snapshot(state: &AppState) -> CategoryTree {
    CategoryTree::new(state.repo.list_categories().await)
}

/// Loads an article through the single-resource predicate. Articles the
/// actor may not see are indistinguishable from missing ones.
async fn visible_article(state: &AppState, actor: &Actor, id: ArticleId) -> Result<Article, StatusCode> {
    let predicate = build_single_resource_predicate(actor);
    state
        .repo
        .find_article(id, &predicate)
        .await
        .ok_or(StatusCode::NOT_FOUND)
}

async fn ensure_category_exists(state: &AppState, category_id: Option<CategoryId>) -> Result<(), StatusCode> {
    if let Some(id) = category_id {
        if state.repo.get_category(id).await.is_none() {
            tracing::debug!(category_id = id, "unknown category in payload");
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    Ok(())
}

// --- Token ---

/// obtain_token
///
/// [Public Route] Exchanges username and password for an access token.
///
/// Bad credentials and frozen accounts both answer `401` with no body; only
/// the logs tell them apart.
#[utoipa::path(
    post,
    path = "/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, StatusCode> {
    match issue_token(state.repo.as_ref(), &state.config, &payload.username, &payload.password).await {
        Ok(token) => Ok(Json(token)),
        Err(TokenError::InvalidCredentials) => Err(StatusCode::UNAUTHORIZED),
        Err(TokenError::Frozen(e)) => {
            tracing::warn!("token refused: {}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e @ TokenError::Signing(_)) => {
            tracing::error!("token issuance failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// get_me
///
/// [Authenticated Route] The requesting user's account.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, StatusCode> {
    state
        .repo
        .get_user(actor.id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// --- Articles ---

/// get_articles
///
/// [Public Route] Lists the articles visible to the actor. Visibility comes
/// from `build_list_predicate`; the category tree is only loaded when a
/// category filter is present.
#[utoipa::path(
    get,
    path = "/articles",
    params(ArticleQuery),
    responses((status = 200, description = "Visible articles", body = [Article]))
)]
pub async fn get_articles(
    actor: Actor,
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> Json<Vec<Article>> {
    let (params, options) = query.split();

    let tree = if params.category_id().is_some() {
        category_snapshot(&state).await
    } else {
        CategoryTree::default()
    };

    let predicate = build_list_predicate(&actor, &params, &tree);
    if predicate.is_nothing() {
        return Json(vec![]);
    }

    Json(state.repo.list_articles(&predicate, &options).await)
}

/// get_article
///
/// [Public Route] One article: published, or a draft of the actor's own.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = Article),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_article(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<ArticleId>,
) -> Result<Json<Article>, StatusCode> {
    visible_article(&state, &actor, id).await.map(Json)
}

/// create_article
///
/// [Authenticated Route] The author is always the requesting user.
#[utoipa::path(
    post,
    path = "/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Created", body = Article),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn create_article(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<Article>), StatusCode> {
    ensure_category_exists(&state, payload.category_id).await?;

    match state.repo.create_article(payload, actor.id).await {
        Some(article) => {
            tracing::info!(article_id = article.id, author_id = actor.id, "article created");
            Ok((StatusCode::CREATED, Json(article)))
        }
        None => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// update_article
///
/// [Authenticated Route] The article is first loaded through the
/// single-resource predicate (`404`), then the mutation gate decides (`403`).
#[utoipa::path(
    put,
    path = "/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 403, description = "Not author or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_article(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ArticleId>,
    Json(payload): Json<UpdateArticleRequest>,
) -> Result<Json<Article>, StatusCode> {
    let article = visible_article(&state, &actor, id).await?;
    if !can_mutate_resource(&actor, &article) {
        tracing::debug!(article_id = id, actor_id = actor.id, "article update forbidden");
        return Err(StatusCode::FORBIDDEN);
    }
    ensure_category_exists(&state, payload.category_id.flatten()).await?;

    state
        .repo
        .update_article(id, payload)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// delete_article
///
/// [Authenticated Route] Same checks as `update_article`.
#[utoipa::path(
    delete,
    path = "/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not author or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ArticleId>,
) -> StatusCode {
    let article = match visible_article(&state, &actor, id).await {
        Ok(article) => article,
        Err(status) => return status,
    };
    if !can_mutate_resource(&actor, &article) {
        return StatusCode::FORBIDDEN;
    }

    if state.repo.delete_article(id).await {
        tracing::info!(article_id = id, actor_id = actor.id, "article deleted");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Comments ---

/// get_article_comments
///
/// [Public Route] Comments of an article the actor can see.
#[utoipa::path(
    get,
    path = "/articles/{id}/comments",
    params(("id" = i64, Path, description = "Article ID")),
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn get_article_comments(
    actor: Actor,
    State(state): State<AppState>,
    Path(id): Path<ArticleId>,
) -> Result<Json<Vec<Comment>>, StatusCode> {
    visible_article(&state, &actor, id).await?;
    Ok(Json(state.repo.list_comments(id).await))
}

/// add_comment
///
/// [Authenticated Route] Commenting requires the article to be visible to
/// the commenter.
#[utoipa::path(
    post,
    path = "/articles/{id}/comments",
    params(("id" = i64, Path, description = "Article ID")),
    request_body = CommentRequest,
    responses((status = 201, description = "Comment Added", body = Comment))
)]
pub async fn add_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ArticleId>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), StatusCode> {
    if payload.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    visible_article(&state, &actor, id).await?;

    state
        .repo
        .add_comment(id, actor.id, payload.content)
        .await
        .map(|comment| (StatusCode::CREATED, Json(comment)))
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// update_comment
///
/// [Authenticated Route] Same gates as `delete_comment`: the parent article
/// must be visible, then only the comment's author or staff may edit it.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 400, description = "Blank content"),
        (status = 403, description = "Not author or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<Comment>, StatusCode> {
    let comment = state.repo.get_comment(id).await.ok_or(StatusCode::NOT_FOUND)?;
    visible_article(&state, &actor, comment.article_id).await?;
    if !can_mutate_resource(&actor, &comment) {
        return Err(StatusCode::FORBIDDEN);
    }
    if payload.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    state
        .repo
        .update_comment(id, payload.content)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// delete_comment
///
/// [Authenticated Route] Author of the comment or staff; the parent article
/// must still be visible to the actor.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not author or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
) -> StatusCode {
    let Some(comment) = state.repo.get_comment(id).await else {
        return StatusCode::NOT_FOUND;
    };
    if let Err(status) = visible_article(&state, &actor, comment.article_id).await {
        return status;
    }
    if !can_mutate_resource(&actor, &comment) {
        return StatusCode::FORBIDDEN;
    }

    if state.repo.delete_comment(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Categories ---

/// get_categories
///
/// [Public Route] Every category with its parent, path and child count.
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Categories", body = [CategoryDetails]))
)]
pub async fn get_categories(State(state): State<AppState>) -> Json<Vec<CategoryDetails>> {
    let categories = state.repo.list_categories().await;
    let ids: Vec<CategoryId> = categories.iter().map(|category| category.id).collect();
    let tree = CategoryTree::new(categories);

    Json(ids.into_iter().filter_map(|id| tree.details(id)).collect())
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = CategoryDetails),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<CategoryDetails>, StatusCode> {
    category_snapshot(&state)
        .await
        .details(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// get_category_closure
///
/// [Public Route] Ids of the category and all of its descendants, ascending.
#[utoipa::path(
    get,
    path = "/categories/{id}/closure",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category ids", body = [i64]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category_closure(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Vec<CategoryId>>, StatusCode> {
    let closure = category_snapshot(&state).await.descendant_closure(id);
    if closure.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    let mut ids: Vec<CategoryId> = closure.into_iter().collect();
    ids.sort_unstable();
    Ok(Json(ids))
}

/// Checks a category payload against the current tree: the name must be
/// non-blank and the parent must exist without lying inside the subtree of
/// the category being edited.
fn validate_category(tree: &CategoryTree, id: Option<CategoryId>, req: &CategoryRequest) -> Result<(), StatusCode> {
    if req.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if let Some(parent_id) = req.parent_id {
        if !tree.contains(parent_id) {
            return Err(StatusCode::BAD_REQUEST);
        }
        if let Some(id) = id {
            if tree.would_create_cycle(id, parent_id) {
                tracing::debug!(category_id = id, parent_id, "reparent would create a cycle");
                return Err(StatusCode::BAD_REQUEST);
            }
        }
    }
    Ok(())
}

/// create_category
///
/// [Authenticated Route] Staff only.
#[utoipa::path(
    post,
    path = "/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Created", body = CategoryDetails),
        (status = 403, description = "Not staff"),
        (status = 409, description = "Name taken")
    )
)]
pub async fn create_category(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryDetails>), StatusCode> {
    if !can_mutate_category(&actor) {
        return Err(StatusCode::FORBIDDEN);
    }
    validate_category(&category_snapshot(&state).await, None, &payload)?;

    let category = state
        .repo
        .create_category(payload)
        .await
        .ok_or(StatusCode::CONFLICT)?;

    category_snapshot(&state)
        .await
        .details(category.id)
        .map(|details| (StatusCode::CREATED, Json(details)))
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// update_category
///
/// [Authenticated Route] Staff only. Rejects reparenting under the
/// category's own subtree.
#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Updated", body = CategoryDetails),
        (status = 400, description = "Invalid parent"),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(payload): Json<CategoryRequest>,
) -> Result<Json<CategoryDetails>, StatusCode> {
    if !can_mutate_category(&actor) {
        return Err(StatusCode::FORBIDDEN);
    }
    let tree = category_snapshot(&state).await;
    if !tree.contains(id) {
        return Err(StatusCode::NOT_FOUND);
    }
    validate_category(&tree, Some(id), &payload)?;

    state
        .repo
        .update_category(id, payload)
        .await
        .ok_or(StatusCode::CONFLICT)?;

    category_snapshot(&state)
        .await
        .details(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// delete_category
///
/// [Authenticated Route] Staff only. Children and articles are detached, not
/// deleted.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> StatusCode {
    if !can_mutate_category(&actor) {
        return StatusCode::FORBIDDEN;
    }
    if state.repo.delete_category(id).await {
        tracing::info!(category_id = id, actor_id = actor.id, "category deleted");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Admin ---

/// get_admin_users
///
/// [Admin Route] All accounts, including frozen ones.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn get_admin_users(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, StatusCode> {
    if !actor.is_staff {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.list_users().await))
}

/// update_user_frozen
///
/// [Admin Route] Freezes or thaws an account. Existing tokens stay valid
/// until they expire; only new issuance is blocked.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/frozen",
    params(("id" = i64, Path, description = "User ID")),
    request_body = bool,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user_frozen(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(is_frozen): Json<bool>,
) -> Result<Json<User>, StatusCode> {
    if !actor.is_staff {
        return Err(StatusCode::FORBIDDEN);
    }
    match state.repo.set_user_frozen(id, is_frozen).await {
        Some(user) => {
            tracing::info!(user_id = id, is_frozen, "account freeze flag changed");
            Ok(Json(user))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}
