//! Content visibility and authorization decisions.
//!
//! Every function here is a pure decision over the requesting [`Actor`] and a
//! snapshot of categories/articles. None of them touch storage, hold state or
//! block, so they can be called from any number of requests at once.
//!
//! [`Actor`]: crate::models::Actor

pub mod account;
pub mod authorization;
pub mod category_tree;
pub mod visibility;

pub use account::{FrozenAccountError, check_issuable};
pub use authorization::{Authored, can_mutate, can_mutate_category, can_mutate_resource};
pub use category_tree::{CategorySource, CategoryTree, descendant_closure};
pub use visibility::{
    ArticleFilter, AuthorScope, ListParams, Predicate, StatusScope, build_list_predicate,
    build_single_resource_predicate,
};
