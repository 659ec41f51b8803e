// src/workflow/session_gate.rs
use std::sync::Arc;
use crate::session::{IdentityProvider, Session, SessionSubscription};
use super::Route;

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Allow(Session),
    Redirect(Route),
}

/// Mount-time check of protected screens.
#[derive(Clone)]
pub struct SessionGate {
    identity: Arc<dyn IdentityProvider>,
}

impl SessionGate {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    /// A failed session lookup counts as no session.
    pub async fn check(&self) -> GateDecision {
        match self.identity.current_session().await {
            Ok(Some(session)) => GateDecision::Allow(session),
            Ok(None) => GateDecision::Redirect(Route::Login),
            Err(err) => {
                log::warn!("Session lookup failed: {}", err);
                GateDecision::Redirect(Route::Login)
            }
        }
    }

    pub fn watch(&self) -> SessionWatch {
        SessionWatch::new(self.identity.subscribe())
    }
}

/// Live session watch of the recorder. Resolves to the login route as
/// soon as the session ends.
pub struct SessionWatch {
    subscription: SessionSubscription,
}

impl SessionWatch {
    pub fn new(subscription: SessionSubscription) -> Self {
        Self { subscription }
    }

    /// `None` once the watch is stopped or the feed closes.
    pub async fn redirect(&mut self) -> Option<Route> {
        while let Some(event) = self.subscription.next().await {
            if event.ends_session() {
                return Some(Route::Login);
            }
        }
        None
    }

    pub fn stop(&mut self) {
        self.subscription.unsubscribe();
    }
}
