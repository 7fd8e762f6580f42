//! `souq-auth`: pure authorization boundary.
//!
//! Authentication itself (sessions, tokens) lives outside this system; callers
//! hand each operation a resolved [`Principal`] and the operation checks it
//! explicitly. There is no ambient "current request" state.

pub mod authorize;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, require_owner_or_staff, require_staff};
pub use principal::Principal;
pub use roles::Role;
