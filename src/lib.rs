pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod notifications;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    error::AuthError,
    handlers::{login_handler, logout_handler, me_handler, register_handler},
    middleware::{authenticate, RequireRole},
    models::{AuthResponse, LoginRequest, MessageResponse, PrincipalResponse, RegisterRequest, Role},
    password::PasswordService,
    repository::PrincipalStore,
    service::AuthService,
    token::TokenService,
};
use config::AppConfig;
use error::ErrorResponse;
use notifications::{
    handlers::{hub_stats_handler, send_notification_handler, SendNotificationRequest},
    hub::{DeliveryReport, HubStats, NotificationHub},
    notifier::Notifier,
    ws::{ws_handler, SocketContext},
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::register_handler,
        auth::handlers::login_handler,
        auth::handlers::me_handler,
        auth::handlers::logout_handler,
        notifications::handlers::send_notification_handler,
        notifications::handlers::hub_stats_handler,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            PrincipalResponse,
            MessageResponse,
            Role,
            ErrorResponse,
            SendNotificationRequest,
            DeliveryReport,
            HubStats
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and session endpoints"),
        (name = "notifications", description = "Realtime notification endpoints for staff")
    ),
    info(
        title = "Meal POS API",
        version = "1.0.0",
        description = "Authentication and realtime notifications for the meal ordering POS"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenService>,
    pub hub: Arc<NotificationHub>,
    pub notifier: Notifier,
    pub allow_unverified_socket_binding: bool,
}

impl AppState {
    /// Wire services together from configuration and a principal store
    pub fn new(config: &AppConfig, store: Arc<dyn PrincipalStore>) -> Result<Self, AuthError> {
        let passwords = PasswordService::new(
            config.password_hash_iterations,
            config.password_hash_memory_kib,
            config.min_password_length,
        )?;
        let tokens = Arc::new(TokenService::new(&config.jwt_secret, config.token_ttl_seconds));
        let hub = Arc::new(NotificationHub::new());

        Ok(Self {
            auth: Arc::new(AuthService::new(store, passwords, tokens.clone())),
            tokens,
            notifier: Notifier::new(hub.clone()),
            hub,
            allow_unverified_socket_binding: config.allow_unverified_socket_binding,
        })
    }

    pub fn socket_context(&self) -> SocketContext {
        SocketContext {
            hub: self.hub.clone(),
            auth: self.auth.clone(),
            allow_unverified_binding: self.allow_unverified_socket_binding,
        }
    }
}

/// Creates and configures the application router
///
/// Every route sits behind `authenticate`, so anonymous requests reach the
/// handlers and a bad token is rejected before any of them run.
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/me", get(me_handler))
        .route("/api/auth/logout", post(logout_handler))
        // Unprefixed paths used by existing POS clients
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/me", get(me_handler))
        .route("/logout", post(logout_handler));

    let staff_routes = Router::new()
        .route("/api/notifications", post(send_notification_handler))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            RequireRole::staff().middleware(req, next)
        }));

    let admin_routes = Router::new()
        .route("/api/notifications/stats", get(hub_stats_handler))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            RequireRole::admin().middleware(req, next)
        }));

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(auth_routes)
        .merge(staff_routes)
        .merge(admin_routes)
        .route("/ws", get(ws_handler))
        .layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            authenticate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
