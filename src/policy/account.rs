use thiserror::Error;

use crate::models::{Actor, UserId};

/// The account is administratively frozen and may not receive a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("account {user_id} is frozen")]
pub struct FrozenAccountError {
    pub user_id: UserId,
}

/// check_issuable
///
/// Final step of token issuance, run only after the password has been
/// verified. Depends on nothing but the freeze flag.
pub fn check_issuable(actor: &Actor) -> Result<(), FrozenAccountError> {
    if actor.is_frozen {
        return Err(FrozenAccountError { user_id: actor.id });
    }
    Ok(())
}
