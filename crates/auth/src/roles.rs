use serde::{Deserialize, Serialize};

/// Role of an authenticated principal.
///
/// The identity provider resolves users to exactly one of these; there is no
/// finer-grained permission model in this system.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Customer,
}

impl Role {
    /// Back-office roles: may act on any user's orders, stock, and points.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Customer => "customer",
        };
        f.write_str(s)
    }
}
