use article_cms::{
    handlers::ArticleQuery,
    models::{ArticleStatus, CreateArticleRequest, UpdateArticleRequest},
    repository::{ArticleOrdering, OrderField},
};

// --- Serialization ---

#[test]
fn test_article_status_uses_lowercase_names() {
    assert_eq!(serde_json::to_string(&ArticleStatus::Draft).unwrap(), r#""draft""#);
    assert_eq!(
        serde_json::from_str::<ArticleStatus>(r#""published""#).unwrap(),
        ArticleStatus::Published
    );
    assert!(serde_json::from_str::<ArticleStatus>(r#""Published""#).is_err());
    assert_eq!(ArticleStatus::Published.as_str(), "published");
}

#[test]
fn test_create_article_request_defaults() {
    let req: CreateArticleRequest = serde_json::from_str(r#"{"title": "T", "content": "C"}"#).unwrap();

    assert_eq!(req.status, ArticleStatus::Draft);
    assert!(req.excerpt.is_empty());
    assert!(req.category_id.is_none());
}

#[test]
fn test_update_article_request_optionality() {
    // Partial updates: only the given fields are serialized.
    let partial_update = UpdateArticleRequest {
        title: Some("New Title Only".to_string()),
        ..UpdateArticleRequest::default()
    };

    let json_output = serde_json::to_string(&partial_update).unwrap();
    assert!(json_output.contains(r#""title":"New Title Only""#));
    assert!(!json_output.contains("content"));
    assert!(!json_output.contains("status"));

    let parsed: UpdateArticleRequest = serde_json::from_str(r#"{"status": "published"}"#).unwrap();
    assert_eq!(parsed.status, Some(ArticleStatus::Published));
    assert!(parsed.title.is_none());
}

#[test]
fn test_update_article_category_null_differs_from_absent() {
    let parse = |json: &str| serde_json::from_str::<UpdateArticleRequest>(json).unwrap().category_id;

    assert_eq!(parse("{}"), None);
    assert_eq!(parse(r#"{"category_id":null}"#), Some(None));
    assert_eq!(parse(r#"{"category_id":4}"#), Some(Some(4)));

    let clear = UpdateArticleRequest {
        category_id: Some(None),
        ..UpdateArticleRequest::default()
    };
    assert_eq!(serde_json::to_string(&clear).unwrap(), r#"{"category_id":null}"#);
}

// --- Query parsing ---

#[test]
fn test_article_ordering_parse() {
    assert_eq!(ArticleOrdering::parse(None), ArticleOrdering::default());
    assert_eq!(
        ArticleOrdering::default(),
        ArticleOrdering {
            field: OrderField::CreatedAt,
            descending: true,
        }
    );

    let title = ArticleOrdering::parse(Some("title"));
    assert_eq!(title.field, OrderField::Title);
    assert!(!title.descending);

    let updated = ArticleOrdering::parse(Some("-updated_at"));
    assert_eq!(updated.field, OrderField::UpdatedAt);
    assert!(updated.descending);

    // Unknown columns never reach the store.
    assert_eq!(ArticleOrdering::parse(Some("password_hash")), ArticleOrdering::default());
    assert_eq!(ArticleOrdering::parse(Some("-")), ArticleOrdering::default());
}

#[test]
fn test_article_query_split() {
    let query = ArticleQuery {
        status: Some("draft".to_string()),
        category: Some("2".to_string()),
        author: Some("me".to_string()),
        search: Some("   ".to_string()),
        ordering: Some("-title".to_string()),
    };

    let (params, options) = query.split();

    assert_eq!(params.status.as_deref(), Some("draft"));
    assert_eq!(params.category_id(), Some(2));
    assert_eq!(params.author.as_deref(), Some("me"));
    // Blank search terms are dropped.
    assert!(options.search.is_none());
    assert_eq!(options.ordering.field, OrderField::Title);
    assert!(options.ordering.descending);
}
