use thiserror::Error;

use souq_core::UserId;

use crate::principal::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: staff role required")]
    StaffRequired,

    #[error("forbidden: not the resource owner")]
    NotOwner,
}

/// Authorize a back-office operation (stock intake, coupon grants, point
/// adjustments, acting on another user's orders).
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn require_staff(principal: &Principal) -> Result<(), AuthzError> {
    if principal.is_staff() {
        Ok(())
    } else {
        Err(AuthzError::StaffRequired)
    }
}

/// Authorize an operation on a resource owned by `owner`.
///
/// Staff may act on anyone's resources; customers only on their own.
pub fn require_owner_or_staff(principal: &Principal, owner: UserId) -> Result<(), AuthzError> {
    if principal.is_staff() || principal.user_id == owner {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}
