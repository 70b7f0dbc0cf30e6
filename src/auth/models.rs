// Authentication data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::validate_username;

/// Principal role, a closed set
///
/// Stored as lowercase text in the database and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Staff, Role::Admin];

    /// Capabilities held by this role
    ///
    /// Admin carries staff capability; no other role inherits anything.
    pub fn grants(self) -> &'static [Role] {
        match self {
            Role::Customer => &[Role::Customer],
            Role::Staff => &[Role::Staff],
            Role::Admin => &[Role::Admin, Role::Staff],
        }
    }

    /// Whether this role may act as `required`
    pub fn satisfies(self, required: Role) -> bool {
        self.grants().contains(&required)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
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
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Set of roles a route accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new(roles: &[Role]) -> Self {
        Self(roles.to_vec())
    }

    /// True when `role` grants any member of the set
    pub fn permits(&self, role: Role) -> bool {
        self.0.iter().any(|required| role.satisfies(*required))
    }

    pub fn roles(&self) -> &[Role] {
        &self.0
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|r| r.as_str()).collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Principal database model
#[derive(Debug, Clone, FromRow)]
pub struct Principal {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a principal
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Principal response model (excludes password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrincipalResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Principal> for PrincipalResponse {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.id,
            username: principal.username,
            email: principal.email,
            role: principal.role,
            created_at: principal.created_at,
        }
    }
}

/// Registration request DTO
///
/// Self-registration always creates a customer; password length is
/// checked separately against the configured minimum.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50), custom = "validate_username")]
    #[schema(example = "jdoe")]
    pub username: String,
    #[validate(email)]
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "correct-horse-battery")]
    pub password: String,
}

/// Login request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Authentication response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub principal: PrincipalResponse,
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
