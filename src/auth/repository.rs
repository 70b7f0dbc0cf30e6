// Principal store: the relational collaborator behind registration and login

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::PgPool;

use crate::auth::{
    error::AuthError,
    models::{NewPrincipal, Principal},
};

/// Storage operations the auth core needs from the principal table
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Insert a principal; duplicate username or email is a conflict
    async fn create(&self, new: NewPrincipal) -> Result<Principal, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, AuthError>;

    /// Case-insensitive email lookup
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, AuthError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Principal>, AuthError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.find_by_email(email).await?.is_some())
    }
}

const PRINCIPAL_COLUMNS: &str = "id, username, email, role, password_hash, created_at";

/// Postgres-backed principal store
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn create(&self, new: NewPrincipal) -> Result<Principal, AuthError> {
        let query = format!(
            "INSERT INTO principals (username, email, role, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            PRINCIPAL_COLUMNS
        );

        sqlx::query_as::<_, Principal>(&query)
            .bind(&new.username)
            .bind(&new.email)
            .bind(new.role)
            .bind(&new.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                // Check for unique constraint violation
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return match db_err.constraint() {
                            Some(name) if name.contains("email") => AuthError::EmailTaken,
                            _ => AuthError::UsernameTaken,
                        };
                    }
                }
                AuthError::Store(e.to_string())
            })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, AuthError> {
        let query = format!("SELECT {} FROM principals WHERE username = $1", PRINCIPAL_COLUMNS);
        let principal = sqlx::query_as::<_, Principal>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(principal)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, AuthError> {
        let query = format!(
            "SELECT {} FROM principals WHERE LOWER(email) = LOWER($1)",
            PRINCIPAL_COLUMNS
        );
        let principal = sqlx::query_as::<_, Principal>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(principal)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Principal>, AuthError> {
        let query = format!("SELECT {} FROM principals WHERE id = $1", PRINCIPAL_COLUMNS);
        let principal = sqlx::query_as::<_, Principal>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(principal)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM principals WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM principals WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }
}

/// In-process principal store with the same uniqueness rules
///
/// Used by the test suite and for running the server without Postgres.
#[derive(Default)]
pub struct MemoryPrincipalStore {
    principals: Mutex<Vec<Principal>>,
}

impl MemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn create(&self, new: NewPrincipal) -> Result<Principal, AuthError> {
        let mut principals = self.principals.lock();

        if principals.iter().any(|p| p.username == new.username) {
            return Err(AuthError::UsernameTaken);
        }
        if principals.iter().any(|p| p.email.eq_ignore_ascii_case(&new.email)) {
            return Err(AuthError::EmailTaken);
        }

        let id = principals.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let principal = Principal {
            id,
            username: new.username,
            email: new.email,
            role: new.role,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };
        principals.push(principal.clone());
        Ok(principal)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, AuthError> {
        Ok(self
            .principals
            .lock()
            .iter()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, AuthError> {
        Ok(self
            .principals
            .lock()
            .iter()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Principal>, AuthError> {
        Ok(self.principals.lock().iter().find(|p| p.id == id).cloned())
    }
}
