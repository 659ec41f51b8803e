// src/session.rs - Identity seam and the local session provider
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{broadcast, Mutex};
use tokio::sync::broadcast::error::RecvError;
use crate::auth::{authenticate, revoke_token, AuthService, Claims, Credentials, User};
use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};

const SESSION_CHANNEL_CAPACITY: usize = 16;

// ======== SESSION ========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_claims(access_token: String, claims: &Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
            access_token,
            expires_at: claims.expires_at(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
    Expired,
}

impl SessionEvent {
    pub fn ends_session(&self) -> bool {
        matches!(self, SessionEvent::SignedOut | SessionEvent::Expired)
    }
}

/// Handle on the session-change feed. Dropping it, or calling
/// [`SessionSubscription::unsubscribe`], ends the subscription.
pub struct SessionSubscription {
    receiver: Option<broadcast::Receiver<SessionEvent>>,
}

impl SessionSubscription {
    pub fn new(receiver: broadcast::Receiver<SessionEvent>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Next session change, or `None` once unsubscribed or the provider is gone.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Session subscriber lagged, {} notifications skipped", skipped);
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}

// ======== IDENTITY PROVIDER ========

/// Identity collaborator of the screen workflows.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The active session, if any. An expired session is cleared and
    /// reported as absent.
    async fn current_session(&self) -> ApiResult<Option<Session>>;

    async fn sign_up(&self, credentials: &Credentials) -> ApiResult<()>;

    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<Session>;

    async fn sign_out(&self) -> ApiResult<()>;

    fn subscribe(&self) -> SessionSubscription;
}

/// Identity provider backed by the local users table.
pub struct LocalIdentity {
    pool: SqlitePool,
    auth_service: Arc<AuthService>,
    auth_config: AuthConfig,
    current: Mutex<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl LocalIdentity {
    pub fn new(pool: SqlitePool, auth_service: Arc<AuthService>, auth_config: AuthConfig) -> Self {
        let (events, _) = broadcast::channel(SESSION_CHANNEL_CAPACITY);
        Self {
            pool,
            auth_service,
            auth_config,
            current: Mutex::new(None),
            events,
        }
    }

    fn notify(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn current_session(&self) -> ApiResult<Option<Session>> {
        let mut current = self.current.lock().await;
        match current.as_ref() {
            Some(session) if session.is_expired() => {
                log::info!("Session of {} expired", session.email);
                *current = None;
                drop(current);
                self.notify(SessionEvent::Expired);
                Ok(None)
            }
            other => Ok(other.cloned()),
        }
    }

    async fn sign_up(&self, credentials: &Credentials) -> ApiResult<()> {
        if !self.auth_config.allow_self_registration {
            return Err(ApiError::Forbidden("Self-registration is disabled".to_string()));
        }
        let user = User::create(&self.pool, credentials, &self.auth_service).await?;
        log::info!("User registered: {}", user.email);
        Ok(())
    }

    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<Session> {
        let user = authenticate(&self.pool, &self.auth_service, &self.auth_config, credentials).await?;
        let (token, claims) = self.auth_service.generate_token(&user)?;
        let session = Session::from_claims(token, &claims);

        *self.current.lock().await = Some(session.clone());
        log::info!("User signed in: {}", session.email);
        self.notify(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> ApiResult<()> {
        let previous = self.current.lock().await.take();
        let Some(session) = previous else {
            return Ok(());
        };

        // An already expired token needs no revocation
        if let Ok(claims) = self.auth_service.verify_token(&session.access_token) {
            revoke_token(&self.pool, &claims).await?;
        }

        log::info!("User signed out: {}", session.email);
        self.notify(SessionEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.events.subscribe())
    }
}
