use crate::models::{Actor, Article, Comment, UserId};

/// Authored
///
/// A resource with a single, immutable owner.
pub trait Authored {
    fn author_id(&self) -> UserId;
}

impl Authored for Article {
    fn author_id(&self) -> UserId {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> UserId {
        self.author_id
    }
}

/// can_mutate
///
/// Update/delete is allowed for the resource's author and for any staff
/// actor. Reads never reach this gate.
pub fn can_mutate(actor: &Actor, resource_author_id: UserId) -> bool {
    actor.is_staff || actor.authenticated_id() == Some(resource_author_id)
}

pub fn can_mutate_resource<R: Authored + ?Sized>(actor: &Actor, resource: &R) -> bool {
    can_mutate(actor, resource.author_id())
}

/// can_mutate_category
///
/// Categories have no owner: only staff may create, update or delete them.
pub fn can_mutate_category(actor: &Actor) -> bool {
    actor.is_staff
}
