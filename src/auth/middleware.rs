// Authentication and authorization middleware for HTTP routes

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{
    error::AuthError,
    models::{Role, RoleSet},
    token::TokenService,
};

/// Identity attached to a request after its bearer token validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub principal_id: i32,
    pub role: Role,
}

/// Pull the token out of `Authorization: Bearer <token>`
///
/// `Ok(None)` when the header is absent; any other shape is malformed.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(Some(token))
}

/// Layer applied to every route
///
/// Requests without a header continue anonymously; a header that is present
/// must carry a valid token or the request is rejected here.
pub async fn authenticate(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request.uri().path().to_string();

    let token = bearer_token(request.headers()).map_err(|e| {
        warn!("Rejected Authorization header for {}: {}", path, e);
        e
    })?;

    if let Some(token) = token {
        let identity = tokens.validate(token).map_err(|e| {
            // internal reason only; the response body is generic
            warn!("Token validation failed for {}: {}", path, e);
            AuthError::Token(e)
        })?;

        debug!(
            "Authenticated principal_id={} role={} path={}",
            identity.principal_id, identity.role, path
        );
        request.extensions_mut().insert(AuthenticatedPrincipal {
            principal_id: identity.principal_id,
            role: identity.role,
        });
    }

    Ok(next.run(request).await)
}

/// Extractor for routes that require an identity
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedPrincipal>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Extractor for routes that also serve anonymous callers
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<AuthenticatedPrincipal>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(
            parts.extensions.get::<AuthenticatedPrincipal>().cloned(),
        ))
    }
}

/// Route guard declaring the roles a route accepts
///
/// Runs after `authenticate`. Admin passes staff routes through the
/// role capability set, not through a special case here.
#[derive(Debug, Clone)]
pub struct RequireRole {
    allowed: RoleSet,
}

impl RequireRole {
    pub fn any_of(roles: &[Role]) -> Self {
        Self {
            allowed: RoleSet::new(roles),
        }
    }

    /// Staff routes (admin included)
    pub fn staff() -> Self {
        Self::any_of(&[Role::Staff])
    }

    pub fn admin() -> Self {
        Self::any_of(&[Role::Admin])
    }

    /// Decide access for an optional identity
    pub fn check(&self, principal: Option<&AuthenticatedPrincipal>) -> Result<(), AuthError> {
        let principal = principal.ok_or(AuthError::MissingToken)?;
        if self.allowed.permits(principal.role) {
            Ok(())
        } else {
            Err(AuthError::InsufficientRole {
                required: self.allowed.clone(),
                actual: principal.role,
            })
        }
    }

    /// Middleware function that validates role-based access
    pub async fn middleware(self, request: Request, next: Next) -> Result<Response, AuthError> {
        let endpoint = request.uri().path().to_string();
        let principal = request.extensions().get::<AuthenticatedPrincipal>();

        if let Err(e) = self.check(principal) {
            warn!(
                "Authorization failed: principal={:?}, required_role={}, endpoint={}",
                principal.map(|p| p.principal_id),
                self.allowed,
                endpoint
            );
            return Err(e);
        }

        debug!("Authorization successful: endpoint={}", endpoint);
        Ok(next.run(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    const SECRET: &str = "test_secret_key_for_testing_purposes";

    fn test_token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new(SECRET, 3_600))
    }

    async fn whoami(MaybePrincipal(principal): MaybePrincipal) -> String {
        match principal {
            Some(p) => format!("{}:{}", p.principal_id, p.role),
            None => "anonymous".to_string(),
        }
    }

    async fn private(principal: AuthenticatedPrincipal) -> String {
        principal.principal_id.to_string()
    }

    fn test_app(tokens: Arc<TokenService>) -> Router {
        let staff = Router::new()
            .route("/staff", get(|| async { "staff ok" }))
            .route_layer(middleware::from_fn(|req: Request, next: Next| {
                RequireRole::staff().middleware(req, next)
            }));
        let admin = Router::new()
            .route("/admin", get(|| async { "admin ok" }))
            .route_layer(middleware::from_fn(|req: Request, next: Next| {
                RequireRole::admin().middleware(req, next)
            }));

        Router::new()
            .route("/whoami", get(whoami))
            .route("/private", get(private))
            .merge(staff)
            .merge(admin)
            .layer(middleware::from_fn_with_state(tokens, authenticate))
    }

    async fn status_for(app: Router, path: &str, auth: Option<String>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        response.status()
    }

    fn bearer(tokens: &TokenService, id: i32, role: Role) -> Option<String> {
        Some(format!("Bearer {}", tokens.issue_for(id, role).unwrap()))
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Ok(None)));

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def.ghi"));

        for bad in ["Basic dXNlcjpwYXNz", "token_without_bearer", "Bearer ", "bearer abc"] {
            headers.insert(header::AUTHORIZATION, bad.parse().unwrap());
            assert!(matches!(bearer_token(&headers), Err(AuthError::MalformedHeader)));
        }
    }

    #[tokio::test]
    async fn test_anonymous_request_proceeds() {
        let app = test_app(test_token_service());
        assert_eq!(status_for(app, "/whoami", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_identity_required_without_header() {
        let app = test_app(test_token_service());
        assert_eq!(status_for(app, "/private", None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_is_unauthorized_even_on_open_route() {
        let app = test_app(test_token_service());
        let status = status_for(app, "/whoami", Some("Token abc".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let app = test_app(test_token_service());
        let status = status_for(app, "/whoami", Some("Bearer not.a.jwt".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_foreign_token_is_unauthorized() {
        let foreign = TokenService::new("another_secret", 3_600);
        let app = test_app(test_token_service());
        let status = status_for(app, "/private", bearer(&foreign, 1, Role::Admin)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_attaches_identity() {
        let tokens = test_token_service();
        let app = test_app(tokens.clone());
        let request = HttpRequest::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, bearer(&tokens, 42, Role::Staff).unwrap())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"42:staff");
    }

    #[tokio::test]
    async fn test_staff_route_role_matrix() {
        let tokens = test_token_service();

        let cases = [
            (Role::Staff, StatusCode::OK),
            (Role::Admin, StatusCode::OK),
            (Role::Customer, StatusCode::FORBIDDEN),
        ];
        for (role, expected) in cases {
            let app = test_app(tokens.clone());
            let status = status_for(app, "/staff", bearer(&tokens, 1, role)).await;
            assert_eq!(status, expected, "role {} on staff route", role);
        }
    }

    #[tokio::test]
    async fn test_admin_route_denies_staff() {
        let tokens = test_token_service();
        let app = test_app(tokens.clone());
        let status = status_for(app, "/admin", bearer(&tokens, 1, Role::Staff)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_guarded_route_without_token_is_unauthorized_not_forbidden() {
        let app = test_app(test_token_service());
        assert_eq!(status_for(app, "/staff", None).await, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_check_reports_required_and_actual() {
        let guard = RequireRole::staff();
        let customer = AuthenticatedPrincipal { principal_id: 5, role: Role::Customer };
        match guard.check(Some(&customer)) {
            Err(AuthError::InsufficientRole { required, actual }) => {
                assert_eq!(required.roles(), &[Role::Staff]);
                assert_eq!(actual, Role::Customer);
            }
            other => panic!("Expected InsufficientRole, got {:?}", other),
        }
        assert!(matches!(guard.check(None), Err(AuthError::MissingToken)));
    }
}
