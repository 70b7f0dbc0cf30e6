// Realtime notifications
// Channel registry, event fan-out and the WebSocket transport

pub mod events;
pub mod handlers;
pub mod hub;
pub mod notifier;
pub mod ws;

pub use events::{EventKind, NotificationEvent, ServerMessage, Target};
pub use hub::{ConnectionState, DeliveryReport, HubStats, NotificationHub};
pub use notifier::Notifier;
pub use ws::ws_handler;
