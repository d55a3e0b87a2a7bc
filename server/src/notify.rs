//! Outbound delivery seam between the engine and the transport layer.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use blackjack_shared::{ServerMsg, UserId};
use tokio::sync::mpsc;

/// Delivers typed server messages to connected players. The transport
/// layer provides the implementation; engine code only sees this trait.
/// Sends must never block and may be issued while the registry lock is
/// held.
pub trait Notifier: Send + Sync {
    fn to_player(&self, user: &UserId, msg: ServerMsg);

    fn to_players(&self, users: &[UserId], msg: ServerMsg) {
        for user in users {
            self.to_player(user, msg.clone());
        }
    }

    fn broadcast(&self, msg: ServerMsg);
}

/// Channel-backed notifier used by the websocket transport. Messages
/// queue on the per-connection channel and the socket task drains them.
#[derive(Default)]
pub struct ChannelNotifier {
    senders: RwLock<HashMap<UserId, mpsc::UnboundedSender<ServerMsg>>>,
}

impl ChannelNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection's outbound channel to a user. A reconnecting
    /// user replaces their previous channel.
    pub fn register(&self, user: UserId, tx: mpsc::UnboundedSender<ServerMsg>) {
        self.senders
            .write()
            .expect("notifier lock poisoned")
            .insert(user, tx);
    }

    pub fn unregister(&self, user: &UserId) {
        self.senders
            .write()
            .expect("notifier lock poisoned")
            .remove(user);
    }
}

impl Notifier for ChannelNotifier {
    fn to_player(&self, user: &UserId, msg: ServerMsg) {
        let senders = self.senders.read().expect("notifier lock poisoned");
        if let Some(tx) = senders.get(user) {
            let _ = tx.send(msg);
        }
    }

    fn broadcast(&self, msg: ServerMsg) {
        let senders = self.senders.read().expect("notifier lock poisoned");
        for tx in senders.values() {
            let _ = tx.send(msg.clone());
        }
    }
}

/// One delivery captured by [`RecordingNotifier`]. `to` is None for
/// broadcasts.
#[derive(Clone, Debug)]
pub struct Delivery {
    pub to: Option<UserId>,
    pub msg: ServerMsg,
}

/// Test notifier that records every delivery in order.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.sent.lock().expect("notifier lock poisoned"))
    }

    pub fn messages_for(&self, user: &UserId) -> Vec<ServerMsg> {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .iter()
            .filter(|d| d.to.as_ref() == Some(user))
            .map(|d| d.msg.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn to_player(&self, user: &UserId, msg: ServerMsg) {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .push(Delivery {
                to: Some(user.clone()),
                msg,
            });
    }

    fn broadcast(&self, msg: ServerMsg) {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .push(Delivery { to: None, msg });
    }
}
