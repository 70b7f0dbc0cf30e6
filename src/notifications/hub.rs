// Realtime notification hub
//
// Owns the principal -> channel bindings. Every bind, unbind and emit goes
// through one lock, so fan-out never observes a half-updated binding.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::models::Role;
use crate::notifications::events::{NotificationEvent, ServerMessage, Target};

pub type ConnectionId = Uuid;

/// Frames buffered per channel before new ones are dropped
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Per-channel lifecycle: Connected -> Authenticated -> Closed
///
/// Closed channels are dropped from the hub entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Authenticated { principal_id: i32, role: Role },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HubError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error("connection {connection} is already bound to principal {principal_id}")]
    AlreadyBound {
        connection: ConnectionId,
        principal_id: i32,
    },
}

/// Outcome of one emit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeliveryReport {
    /// Channels the target resolved to
    pub resolved: usize,
    /// Channels the frame was handed to
    pub delivered: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct HubStats {
    pub connections: usize,
    pub authenticated: usize,
    pub principals: usize,
}

struct Channel {
    state: ConnectionState,
    sender: Sender<ServerMessage>,
}

#[derive(Default)]
struct HubState {
    channels: HashMap<ConnectionId, Channel>,
    bindings: HashMap<i32, HashSet<ConnectionId>>,
}

impl HubState {
    fn resolve(&self, target: Target) -> Vec<ConnectionId> {
        match target {
            Target::Principal(principal_id) => self
                .bindings
                .get(&principal_id)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
            Target::Role(required) => self
                .channels
                .iter()
                .filter_map(|(id, channel)| match channel.state {
                    ConnectionState::Authenticated { role, .. } if role.satisfies(required) => {
                        Some(*id)
                    }
                    _ => None,
                })
                .collect(),
            Target::All => self
                .channels
                .iter()
                .filter(|(_, channel)| {
                    matches!(channel.state, ConnectionState::Authenticated { .. })
                })
                .map(|(id, _)| *id)
                .collect(),
        }
    }
}

/// Hub shared by the WebSocket transport and event emitters
pub struct NotificationHub {
    state: Mutex<HubState>,
    capacity: usize,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub whose channels each buffer at most `capacity` frames
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            capacity: capacity.max(1),
        }
    }

    /// Register a fresh, unauthenticated channel
    ///
    /// The receiver yields every frame addressed to this channel, in order.
    pub fn connect(&self) -> (ConnectionId, Receiver<ServerMessage>) {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();

        self.state.lock().channels.insert(
            id,
            Channel {
                state: ConnectionState::Connected,
                sender,
            },
        );
        debug!("Channel {} connected", id);
        (id, receiver)
    }

    /// Bind a channel to a principal
    ///
    /// Repeating the bind for the same principal is a no-op; binding to a
    /// different principal is refused.
    pub fn authenticate(
        &self,
        connection: ConnectionId,
        principal_id: i32,
        role: Role,
    ) -> Result<(), HubError> {
        let mut state = self.state.lock();
        let channel = state
            .channels
            .get_mut(&connection)
            .ok_or(HubError::UnknownConnection(connection))?;

        match channel.state {
            ConnectionState::Authenticated { principal_id: bound, .. } if bound == principal_id => {
                return Ok(());
            }
            ConnectionState::Authenticated { principal_id: bound, .. } => {
                return Err(HubError::AlreadyBound {
                    connection,
                    principal_id: bound,
                });
            }
            ConnectionState::Connected => {}
        }

        channel.state = ConnectionState::Authenticated { principal_id, role };
        state.bindings.entry(principal_id).or_default().insert(connection);

        info!("Channel {} bound to principal {} ({})", connection, principal_id, role);
        Ok(())
    }

    /// Drop a channel and its binding; unknown ids are ignored
    pub fn disconnect(&self, connection: ConnectionId) -> bool {
        let mut state = self.state.lock();
        let Some(channel) = state.channels.remove(&connection) else {
            return false;
        };

        if let ConnectionState::Authenticated { principal_id, .. } = channel.state {
            if let Some(ids) = state.bindings.get_mut(&principal_id) {
                ids.remove(&connection);
                if ids.is_empty() {
                    state.bindings.remove(&principal_id);
                }
            }
        }
        debug!("Channel {} closed", connection);
        true
    }

    /// Fan an event out to the channels its target resolves to
    ///
    /// Fire-and-forget: a closed or backed-up channel is logged and skipped,
    /// nothing is queued for channels that are not bound right now.
    pub fn emit(&self, event: &NotificationEvent) -> DeliveryReport {
        let state = self.state.lock();
        let targets = state.resolve(event.target);
        let frame = event.to_frame();

        let mut report = DeliveryReport {
            resolved: targets.len(),
            delivered: 0,
        };
        for id in targets {
            let Some(channel) = state.channels.get(&id) else {
                continue;
            };
            match channel.sender.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Dropping {} for backed-up channel {}", event.kind.wire_name(), id)
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("Dropping {} for closed channel {}", event.kind.wire_name(), id)
                }
            }
        }

        debug!(
            "Emitted {} to {:?}: {}/{} channels",
            event.kind.wire_name(),
            event.target,
            report.delivered,
            report.resolved
        );
        report
    }

    /// Send a frame to one channel regardless of its state
    pub fn reply(&self, connection: ConnectionId, message: ServerMessage) -> bool {
        self.state
            .lock()
            .channels
            .get(&connection)
            .map(|channel| channel.sender.try_send(message).is_ok())
            .unwrap_or(false)
    }

    pub fn state_of(&self, connection: ConnectionId) -> Option<ConnectionState> {
        self.state
            .lock()
            .channels
            .get(&connection)
            .map(|channel| channel.state)
    }

    /// Channels currently bound to a principal
    pub fn channels_for(&self, principal_id: i32) -> Vec<ConnectionId> {
        self.state
            .lock()
            .bindings
            .get(&principal_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Open channels, bound or not
    pub fn connection_count(&self) -> usize {
        self.state.lock().channels.len()
    }

    /// Distinct principals with at least one bound channel
    pub fn bound_principal_count(&self) -> usize {
        self.state.lock().bindings.len()
    }

    pub fn stats(&self) -> HubStats {
        let state = self.state.lock();
        HubStats {
            connections: state.channels.len(),
            authenticated: state.bindings.values().map(HashSet::len).sum(),
            principals: state.bindings.len(),
        }
    }
}
