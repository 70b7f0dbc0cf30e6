// Notification event types and WebSocket wire frames

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::models::Role;

/// Kind of event pushed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Generic notification
    Notification,
    /// Order status change for the ordering customer
    OrderStatus,
    /// Stock fell below its threshold
    LowStock,
}

impl EventKind {
    /// Event name on the socket
    pub fn wire_name(self) -> &'static str {
        match self {
            EventKind::Notification => "notification",
            EventKind::OrderStatus => "order_notification",
            EventKind::LowStock => "low_stock_alert",
        }
    }
}

/// Who an event is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Target {
    Principal(i32),
    /// Every channel whose role satisfies this role
    Role(Role),
    All,
}

/// Event handed to the hub for fan-out
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub target: Target,
    pub payload: Value,
}

impl NotificationEvent {
    pub fn new(kind: EventKind, target: Target, payload: Value) -> Self {
        Self {
            kind,
            target,
            payload,
        }
    }

    /// Generic notification
    pub fn notification(target: Target, payload: Value) -> Self {
        Self::new(EventKind::Notification, target, payload)
    }

    /// Order status update for the customer who placed the order
    pub fn order_status(customer_id: i32, order_id: i64, status: &str) -> Self {
        Self::new(
            EventKind::OrderStatus,
            Target::Principal(customer_id),
            json!({
                "order_id": order_id,
                "status": status,
                "message": format!("Your order #{} is now {}", order_id, status),
            }),
        )
    }

    /// Low stock alert for the staff group
    pub fn low_stock(item: &str, remaining: i64, threshold: i64) -> Self {
        Self::new(
            EventKind::LowStock,
            Target::Role(Role::Staff),
            json!({
                "item": item,
                "remaining": remaining,
                "threshold": threshold,
            }),
        )
    }

    /// Frame as sent to a bound channel
    pub fn to_frame(&self) -> ServerMessage {
        ServerMessage::Event {
            event: self.kind.wire_name(),
            data: self.payload.clone(),
        }
    }
}

/// Frames written to a socket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Event { event: &'static str, data: Value },
    Ack { event: &'static str, data: AckData },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AckData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerMessage {
    pub fn authenticated(principal_id: i32) -> Self {
        ServerMessage::Ack {
            event: "authenticated",
            data: AckData {
                principal_id: Some(principal_id),
                message: None,
            },
        }
    }

    pub fn auth_error(message: &str) -> Self {
        ServerMessage::Ack {
            event: "auth_error",
            data: AckData {
                principal_id: None,
                message: Some(message.to_string()),
            },
        }
    }

    pub fn error(message: &str) -> Self {
        ServerMessage::Ack {
            event: "error",
            data: AckData {
                principal_id: None,
                message: Some(message.to_string()),
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Frames read from a socket
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Authenticate(AuthenticatePayload),
}

/// Either a session token, or the bare principal id older clients send
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AuthenticatePayload {
    Token { token: String },
    PrincipalId { user_id: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(EventKind::Notification.wire_name(), "notification");
        assert_eq!(EventKind::OrderStatus.wire_name(), "order_notification");
        assert_eq!(EventKind::LowStock.wire_name(), "low_stock_alert");
    }

    #[test]
    fn test_order_status_targets_customer() {
        let event = NotificationEvent::order_status(42, 1001, "ready");
        assert_eq!(event.target, Target::Principal(42));
        assert_eq!(event.payload["order_id"], 1001);
        assert_eq!(event.payload["status"], "ready");

        let frame: Value = serde_json::from_str(&event.to_frame().to_json()).unwrap();
        assert_eq!(frame["event"], "order_notification");
        assert_eq!(frame["data"]["status"], "ready");
    }

    #[test]
    fn test_low_stock_targets_staff() {
        let event = NotificationEvent::low_stock("chicken wrap", 3, 10);
        assert_eq!(event.kind, EventKind::LowStock);
        assert_eq!(event.target, Target::Role(Role::Staff));
    }

    #[test]
    fn test_parse_authenticate_with_token() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"event":"authenticate","data":{"token":"abc"}}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Authenticate(AuthenticatePayload::Token { token: "abc".into() })
        );
    }

    #[test]
    fn test_parse_authenticate_with_bare_id() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"event":"authenticate","data":{"user_id":42}}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Authenticate(AuthenticatePayload::PrincipalId { user_id: 42 })
        );
    }

    #[test]
    fn test_unknown_client_event_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"event":"subscribe","data":{}}"#).is_err());
    }

    #[test]
    fn test_ack_frames() {
        let ok: Value = serde_json::from_str(&ServerMessage::authenticated(7).to_json()).unwrap();
        assert_eq!(ok["event"], "authenticated");
        assert_eq!(ok["data"]["principal_id"], 7);

        let err: Value = serde_json::from_str(&ServerMessage::auth_error("nope").to_json()).unwrap();
        assert_eq!(err["event"], "auth_error");
        assert!(err["data"].get("principal_id").is_none());
    }

    #[test]
    fn test_target_json_shape() {
        let target: Target = serde_json::from_str(r#"{"type":"role","value":"staff"}"#).unwrap();
        assert_eq!(target, Target::Role(Role::Staff));
        let all: Target = serde_json::from_str(r#"{"type":"all"}"#).unwrap();
        assert_eq!(all, Target::All);
    }
}
