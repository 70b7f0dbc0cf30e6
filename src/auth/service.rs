// Authentication service - business logic layer

use std::sync::Arc;

use crate::auth::{
    error::AuthError,
    models::{AuthResponse, NewPrincipal, Principal, PrincipalResponse, Role},
    password::PasswordService,
    repository::PrincipalStore,
    token::TokenService,
};

/// Authentication service coordinating store, hashing and tokens
pub struct AuthService {
    store: Arc<dyn PrincipalStore>,
    passwords: PasswordService,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn PrincipalStore>,
        passwords: PasswordService,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            passwords,
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Register a new customer and issue a session token
    ///
    /// Uniqueness is checked up front for a clean error, and again by the
    /// store on insert for concurrent registrations.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        self.passwords.validate_password_strength(password)?;

        if self.store.username_exists(username).await? {
            return Err(AuthError::UsernameTaken);
        }
        if self.store.email_exists(email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.passwords.hash_async(password.to_string()).await?;
        let principal = self
            .store
            .create(NewPrincipal {
                username: username.to_string(),
                email: email.to_string(),
                role: Role::Customer,
                password_hash,
            })
            .await?;

        tracing::info!("Registered principal id={} username={}", principal.id, principal.username);
        self.session_for(principal)
    }

    /// Check credentials and issue a session token
    ///
    /// Unknown username and wrong password produce the same error.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let Some(principal) = self.store.find_by_username(username).await? else {
            tracing::debug!("Login for unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        let verified = self
            .passwords
            .verify_async(password.to_string(), principal.password_hash.clone())
            .await;
        if !verified {
            tracing::debug!("Password mismatch for principal id={}", principal.id);
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!("Principal id={} logged in", principal.id);
        self.session_for(principal)
    }

    /// Look up the principal behind a validated token
    pub async fn current_principal(&self, principal_id: i32) -> Result<PrincipalResponse, AuthError> {
        self.find_principal(principal_id)
            .await
            .map(PrincipalResponse::from)
    }

    pub async fn find_principal(&self, principal_id: i32) -> Result<Principal, AuthError> {
        self.store
            .find_by_id(principal_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound(principal_id))
    }

    fn session_for(&self, principal: Principal) -> Result<AuthResponse, AuthError> {
        let token = self.tokens.issue(&principal)?;
        Ok(AuthResponse {
            token,
            principal: principal.into(),
        })
    }
}
