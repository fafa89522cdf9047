//! Authorization gate in front of every handler

use crate::config::ConfigStore;
use crate::domain::OperatorId;
use crate::session::InboundEvent;

use std::sync::Arc;

/// Reply sent to operators that are not authorized
pub const ACCESS_DENIED: &str = "Access denied";

/// Outcome of the gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Denied(&'static str),
}

/// Checks the actor of each event against the base and extra operator lists
///
/// Every admitted event refreshes the notification destination, so alerts
/// follow the conversation an operator last used.
pub struct Gatekeeper {
    store: Arc<ConfigStore>,
    base: Vec<OperatorId>,
}

impl Gatekeeper {
    pub fn new(store: Arc<ConfigStore>, base: Vec<OperatorId>) -> Self {
        Self { store, base }
    }

    /// Operators configured in settings
    pub fn base(&self) -> &[OperatorId] {
        &self.base
    }

    pub async fn admit(&self, event: &InboundEvent) -> Admission {
        let actor = event.actor();
        if !self.store.is_authorized(actor, &self.base).await {
            log::warn!("Rejected event from operator {}", actor);
            return Admission::Denied(ACCESS_DENIED);
        }

        if let Err(e) = self.store.set_notification_destination(event.chat()).await {
            log::warn!("Failed to record notification destination: {}", e);
        }
        Admission::Admitted
    }
}
