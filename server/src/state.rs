//! Shared application state handed to every handler.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::notify::Notifier;
use crate::registry::SessionStore;
use crate::store::GameStore;

/// Shared application state exposed to handlers.
///
/// The registry lock serializes all session and group mutations and is
/// never held across an await. Paced sequences (dealing, dealer play,
/// settlement persistence) re-acquire it and re-validate group and
/// membership state after every suspension point.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<SessionStore>>,
    pub notifier: Arc<dyn Notifier>,
    pub store: Arc<dyn GameStore>,
    pub auth: Arc<dyn Authenticator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn GameStore>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        AppState {
            sessions: Arc::new(RwLock::new(SessionStore::new())),
            notifier,
            store,
            auth,
            config: Arc::new(config),
        }
    }
}
