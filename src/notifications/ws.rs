// WebSocket transport for the notification hub

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::auth::{models::Role, service::AuthService};
use crate::notifications::{
    events::{AuthenticatePayload, ClientMessage, ServerMessage},
    hub::{ConnectionId, NotificationHub},
};
use crate::AppState;

/// What a socket needs to bind itself to a principal
#[derive(Clone)]
pub struct SocketContext {
    pub hub: Arc<NotificationHub>,
    pub auth: Arc<AuthService>,
    /// Honour `authenticate {user_id}` without a token
    pub allow_unverified_binding: bool,
}

/// GET /ws
///
/// No credentials are needed to open the socket; the client binds it
/// afterwards with an `authenticate` frame.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let ctx = state.socket_context();
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: SocketContext) {
    let (connection, mut outbound) = ctx.hub.connect();
    let (mut sink, mut stream) = socket.split();

    // Single writer keeps hub frames and acks in order
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame.to_json())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                let reply = handle_client_frame(&ctx, connection, &text).await;
                ctx.hub.reply(connection, reply);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    ctx.hub.disconnect(connection);
    writer.abort();
}

/// Process one text frame from a client and produce the reply frame
pub async fn handle_client_frame(
    ctx: &SocketContext,
    connection: ConnectionId,
    text: &str,
) -> ServerMessage {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("Unparseable frame on {}: {}", connection, e);
            return ServerMessage::error("unsupported message");
        }
    };

    match message {
        ClientMessage::Authenticate(AuthenticatePayload::Token { token }) => {
            let identity = match ctx.auth.tokens().validate(&token) {
                Ok(identity) => identity,
                Err(e) => {
                    warn!("Socket {} presented a bad token: {}", connection, e);
                    return ServerMessage::auth_error("invalid or expired token");
                }
            };
            bind(ctx, connection, identity.principal_id, identity.role)
        }
        ClientMessage::Authenticate(AuthenticatePayload::PrincipalId { user_id }) => {
            if !ctx.allow_unverified_binding {
                warn!(
                    "Socket {} tried to bind to principal {} without a token",
                    connection, user_id
                );
                return ServerMessage::auth_error("session token required");
            }
            match ctx.auth.find_principal(user_id).await {
                Ok(principal) => bind(ctx, connection, principal.id, principal.role),
                Err(e) => {
                    debug!("Unverified bind to {} failed: {}", user_id, e);
                    ServerMessage::auth_error("unknown principal")
                }
            }
        }
    }
}

fn bind(
    ctx: &SocketContext,
    connection: ConnectionId,
    principal_id: i32,
    role: Role,
) -> ServerMessage {
    match ctx.hub.authenticate(connection, principal_id, role) {
        Ok(()) => ServerMessage::authenticated(principal_id),
        Err(e) => {
            warn!("Socket bind refused: {}", e);
            ServerMessage::auth_error("socket already bound to another principal")
        }
    }
}
