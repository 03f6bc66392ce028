//! Operation Context
//!
//! The verified principal behind a request plus metadata used for auditing
//! and tracing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::DomainError;

/// Role tag carried by an authenticated principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::InvalidInput(format!("unknown role: {}", other))),
        }
    }
}

/// Verified identity supplied by the authentication layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the principal owns the resource or is an administrator
    pub fn can_read_owned_by(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id || self.is_admin()
    }
}

/// Capability guard for mutating ledger operations and cross-user reads.
pub fn require_admin(principal: &Principal) -> Result<(), DomainError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden("admin role required".to_string()))
    }
}

/// Context for an operation, used for auditing and tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// Authenticated principal for this request
    pub principal: Principal,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl OperationContext {
    /// Create a context for the given principal
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            correlation_id: None,
        }
    }

    /// Create context with correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }

    /// The acting user
    pub fn actor_id(&self) -> Uuid {
        self.principal.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("Admin".parse::<Role>().is_err());
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_require_admin() {
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);
        let user = Principal::new(Uuid::new_v4(), Role::User);

        assert!(require_admin(&admin).is_ok());
        assert!(matches!(require_admin(&user), Err(DomainError::Forbidden(_))));
    }

    #[test]
    fn test_can_read_owned_by() {
        let owner = Uuid::new_v4();
        let user = Principal::new(owner, Role::User);
        let stranger = Principal::new(Uuid::new_v4(), Role::User);
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);

        assert!(user.can_read_owned_by(owner));
        assert!(!stranger.can_read_owned_by(owner));
        assert!(admin.can_read_owned_by(owner));
    }

    #[test]
    fn test_ensure_correlation_id() {
        let mut context = OperationContext::new(Principal::new(Uuid::new_v4(), Role::User));
        assert!(context.correlation_id.is_none());

        let id = context.ensure_correlation_id();
        assert_eq!(context.correlation_id, Some(id));

        let id2 = context.ensure_correlation_id();
        assert_eq!(id, id2);
    }
}
