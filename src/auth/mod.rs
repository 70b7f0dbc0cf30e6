// Authentication module
// Password hashing, session tokens, role checks and the auth HTTP endpoints

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use handlers::{login_handler, logout_handler, me_handler, register_handler};
pub use middleware::{authenticate, AuthenticatedPrincipal, MaybePrincipal, RequireRole};
pub use models::{AuthResponse, LoginRequest, Principal, PrincipalResponse, RegisterRequest, Role};
pub use repository::{MemoryPrincipalStore, PgPrincipalStore, PrincipalStore};
pub use service::AuthService;
pub use token::{TokenError, TokenService};
