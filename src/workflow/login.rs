// src/workflow/login.rs
use std::sync::Arc;
use tokio::sync::Mutex;
use crate::auth::Credentials;
use crate::session::IdentityProvider;
use super::Route;

pub const REGISTRATION_OK: &str = "Registration OK. If email confirmation is required, check your inbox.";
pub const SIGNED_OUT: &str = "Signed out";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginState {
    pub email: String,
    pub password: String,
    pub message: Option<String>,
    pub busy: bool,
}

#[derive(Debug, Clone, Copy)]
enum AuthAction {
    SignUp,
    SignIn,
    SignOut,
}

impl AuthAction {
    fn error_prefix(self) -> &'static str {
        match self {
            AuthAction::SignUp => "Registration error",
            AuthAction::SignIn => "Login error",
            AuthAction::SignOut => "Logout error",
        }
    }
}

pub struct LoginScreen {
    identity: Arc<dyn IdentityProvider>,
    state: Mutex<LoginState>,
}

impl LoginScreen {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            state: Mutex::new(LoginState::default()),
        }
    }

    pub async fn snapshot(&self) -> LoginState {
        self.state.lock().await.clone()
    }

    /// Already signed in: go straight to the recorder.
    pub async fn mount(&self) -> Option<Route> {
        match self.identity.current_session().await {
            Ok(Some(_)) => Some(Route::Recorder),
            _ => None,
        }
    }

    pub async fn set_email(&self, email: &str) {
        self.state.lock().await.email = email.to_string();
    }

    pub async fn set_password(&self, password: &str) {
        self.state.lock().await.password = password.to_string();
    }

    pub async fn sign_up(&self) {
        let Some(credentials) = self.begin().await else {
            return;
        };
        let result = self.identity.sign_up(&credentials).await;
        self.finish(AuthAction::SignUp, result.map(|_| REGISTRATION_OK.to_string())).await;
    }

    /// Navigates to the recorder on success.
    pub async fn sign_in(&self) -> Option<Route> {
        let credentials = self.begin().await?;
        let result = self.identity.sign_in(&credentials).await;
        let signed_in = result.is_ok();
        // Successful sign-in leaves no message; the screen navigates away
        self.finish(AuthAction::SignIn, result.map(|_| String::new())).await;
        signed_in.then_some(Route::Recorder)
    }

    pub async fn sign_out(&self) {
        if self.begin().await.is_none() {
            return;
        }
        let result = self.identity.sign_out().await;
        self.finish(AuthAction::SignOut, result.map(|_| SIGNED_OUT.to_string())).await;
    }

    /// Marks the screen busy and clears the message. `None` while another
    /// action is running.
    async fn begin(&self) -> Option<Credentials> {
        let mut state = self.state.lock().await;
        if state.busy {
            return None;
        }
        state.busy = true;
        state.message = None;
        Some(Credentials::new(state.email.clone(), state.password.clone()))
    }

    async fn finish(&self, action: AuthAction, result: crate::error::ApiResult<String>) {
        let mut state = self.state.lock().await;
        state.busy = false;
        state.message = match result {
            Ok(message) if message.is_empty() => None,
            Ok(message) => Some(message),
            Err(err) => {
                log::warn!("{} for {}: {}", action.error_prefix(), state.email, err);
                Some(format!("{}: {}", action.error_prefix(), err.detail()))
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::test_support::{session, MockIdentity};

    async fn screen(identity: MockIdentity) -> LoginScreen {
        let screen = LoginScreen::new(Arc::new(identity));
        screen.set_email("nurse@example.com").await;
        screen.set_password("secret1").await;
        screen
    }

    #[actix_rt::test]
    async fn test_mount_redirects_when_signed_in() {
        let signed_in = LoginScreen::new(Arc::new(MockIdentity::new(Some(session("user-a")))));
        assert_eq!(signed_in.mount().await, Some(Route::Recorder));

        let anonymous = LoginScreen::new(Arc::new(MockIdentity::new(None)));
        assert_eq!(anonymous.mount().await, None);
    }

    #[actix_rt::test]
    async fn test_sign_in_navigates_to_recorder() {
        let screen = screen(MockIdentity::new(None)).await;
        assert_eq!(screen.sign_in().await, Some(Route::Recorder));
        let state = screen.snapshot().await;
        assert_eq!(state.message, None);
        assert!(!state.busy);
    }

    #[actix_rt::test]
    async fn test_messages() {
        let ok = screen(MockIdentity::new(None)).await;
        ok.sign_up().await;
        assert_eq!(ok.snapshot().await.message.as_deref(), Some(REGISTRATION_OK));
        ok.sign_out().await;
        assert_eq!(ok.snapshot().await.message.as_deref(), Some(SIGNED_OUT));

        let failing = screen(MockIdentity::failing("Invalid login credentials")).await;
        assert_eq!(failing.sign_in().await, None);
        assert_eq!(
            failing.snapshot().await.message.as_deref(),
            Some("Login error: Invalid login credentials")
        );
        failing.sign_up().await;
        assert_eq!(
            failing.snapshot().await.message.as_deref(),
            Some("Registration error: Invalid login credentials")
        );
        failing.sign_out().await;
        assert_eq!(
            failing.snapshot().await.message.as_deref(),
            Some("Logout error: Invalid login credentials")
        );
    }
}
