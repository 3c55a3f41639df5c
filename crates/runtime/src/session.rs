//! Application-wide session state.
//!
//! Every part of the app can read the current identity and ask for the login
//! affordance without threading the user through call chains. The context is
//! created once at start-up, and mutated only through its own operations; readers get a
//! snapshot or a `watch` subscription.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use foundation::{BoxFuture, UserId};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::event_bus::{EventBus, Severity, UiEventKind};

/// An authenticated session as handed out by the auth backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub email: Option<String>,
    pub access_token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(Session),
    /// Account created, but the backend wants the email address verified first.
    ConfirmationRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    EmailNotConfirmed,
    AlreadyRegistered,
    NotSignedIn,
    Backend(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid email or password"),
            AuthError::EmailNotConfirmed => write!(f, "email address has not been verified"),
            AuthError::AlreadyRegistered => write!(f, "email address is already registered"),
            AuthError::NotSignedIn => write!(f, "no active session"),
            AuthError::Backend(msg) => write!(f, "auth backend error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Imperative auth operations provided by the backend.
pub trait AuthBackend: Send + Sync {
    /// Returns a previously established session, if the backend still holds one.
    fn restore(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>>;

    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Session, AuthError>>;

    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<SignUpOutcome, AuthError>>;

    fn sign_out<'a>(&'a self, session: &'a Session) -> BoxFuture<'a, Result<(), AuthError>>;
}

struct SessionInner {
    backend: Arc<dyn AuthBackend>,
    current: watch::Sender<Option<Session>>,
    events: EventBus,
}

/// Shared session context. Clones observe and mutate the same session.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("current", &*self.inner.current.borrow())
            .finish()
    }
}

impl SessionContext {
    pub fn new(backend: Arc<dyn AuthBackend>, events: EventBus) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                backend,
                current,
                events,
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Option<Session> {
        self.inner.current.borrow().clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map(|s| s.user_id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Subscribes to session changes. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.current.subscribe()
    }

    /// Asks the UI to open the login affordance. Fire-and-forget.
    pub fn request_login(&self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!("login requested: {reason}");
        self.inner.events.emit(UiEventKind::LoginRequested, reason);
    }

    /// Picks up an existing session from the backend, if any.
    pub async fn restore(&self) -> Result<Option<UserId>, AuthError> {
        let session = self.inner.backend.restore().await?;
        let user = session.as_ref().map(|s| s.user_id.clone());
        self.publish(session);
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserId, AuthError> {
        match self.inner.backend.sign_in(email, password).await {
            Ok(session) => {
                let user = session.user_id.clone();
                info!("signed in as {user}");
                self.publish(Some(session));
                self.inner
                    .events
                    .notify(Severity::Success, "Successfully signed in!");
                Ok(user)
            }
            Err(err) => {
                warn!("sign in failed: {err}");
                let text = match &err {
                    AuthError::EmailNotConfirmed => {
                        "Your email address has not been verified. Please check your inbox."
                            .to_string()
                    }
                    AuthError::InvalidCredentials => {
                        "Invalid email or password. Please try again.".to_string()
                    }
                    other => other.to_string(),
                };
                self.inner.events.notify(Severity::Error, text);
                Err(err)
            }
        }
    }

    /// Creates an account. An already-registered address falls back to signing in
    /// with the supplied credentials.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        match self.inner.backend.sign_up(email, password).await {
            Ok(SignUpOutcome::SignedIn(session)) => {
                info!("account created and signed in as {}", session.user_id);
                self.publish(Some(session.clone()));
                self.inner.events.notify(
                    Severity::Success,
                    "Account created and signed in successfully!",
                );
                Ok(SignUpOutcome::SignedIn(session))
            }
            Ok(SignUpOutcome::ConfirmationRequired) => {
                self.inner.events.notify(
                    Severity::Info,
                    "Account created. Please check your email for a verification link.",
                );
                Ok(SignUpOutcome::ConfirmationRequired)
            }
            Err(AuthError::AlreadyRegistered) => {
                debug!("sign up for registered address, trying sign in");
                self.inner.events.notify(
                    Severity::Info,
                    "This email is already registered. Trying to sign in...",
                );
                let session = self.inner.backend.sign_in(email, password).await?;
                self.publish(Some(session.clone()));
                Ok(SignUpOutcome::SignedIn(session))
            }
            Err(err) => {
                warn!("sign up failed: {err}");
                self.inner.events.notify(Severity::Error, err.to_string());
                Err(err)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.current() else {
            return Err(AuthError::NotSignedIn);
        };
        if let Err(err) = self.inner.backend.sign_out(&session).await {
            self.inner.events.notify(Severity::Error, err.to_string());
            return Err(err);
        }
        info!("signed out {}", session.user_id);
        self.publish(None);
        self.inner
            .events
            .notify(Severity::Success, "Successfully signed out!");
        Ok(())
    }

    fn publish(&self, session: Option<Session>) {
        self.inner.current.send_replace(session);
    }
}

#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    password: String,
    confirmed: bool,
}

/// In-process auth backend: accounts live in a map, tokens are synthetic.
///
/// Used by tests and offline runs of the app.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
    restored: Mutex<Option<Session>>,
    require_confirmation: bool,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// New accounts must be confirmed before they can sign in.
    pub fn requiring_confirmation() -> Self {
        Self {
            require_confirmation: true,
            ..Self::default()
        }
    }

    pub fn with_account(self, email: &str, password: &str, user_id: impl Into<UserId>) -> Self {
        self.accounts.lock().insert(
            email.to_string(),
            Account {
                user_id: user_id.into(),
                password: password.to_string(),
                confirmed: true,
            },
        );
        self
    }

    /// Makes `restore` hand back a session for the given account.
    pub fn with_restored_session(self, email: &str) -> Self {
        let session = self
            .accounts
            .lock()
            .get(email)
            .map(|acct| session_for(email, acct));
        *self.restored.lock() = session;
        self
    }

    pub fn confirm(&self, email: &str) -> bool {
        match self.accounts.lock().get_mut(email) {
            Some(acct) => {
                acct.confirmed = true;
                true
            }
            None => false,
        }
    }
}

fn session_for(email: &str, acct: &Account) -> Session {
    Session {
        user_id: acct.user_id.clone(),
        email: Some(email.to_string()),
        access_token: format!("memory-token-{}", acct.user_id),
    }
}

impl AuthBackend for MemoryAuth {
    fn restore(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>> {
        Box::pin(async move { Ok(self.restored.lock().clone()) })
    }

    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Session, AuthError>> {
        Box::pin(async move {
            let accounts = self.accounts.lock();
            let acct = accounts
                .get(email)
                .filter(|a| a.password == password)
                .ok_or(AuthError::InvalidCredentials)?;
            if !acct.confirmed {
                return Err(AuthError::EmailNotConfirmed);
            }
            Ok(session_for(email, acct))
        })
    }

    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<SignUpOutcome, AuthError>> {
        Box::pin(async move {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(email) {
                return Err(AuthError::AlreadyRegistered);
            }
            let acct = Account {
                user_id: UserId::new(format!("user-{}", accounts.len() + 1)),
                password: password.to_string(),
                confirmed: !self.require_confirmation,
            };
            let outcome = if acct.confirmed {
                SignUpOutcome::SignedIn(session_for(email, &acct))
            } else {
                SignUpOutcome::ConfirmationRequired
            };
            accounts.insert(email.to_string(), acct);
            Ok(outcome)
        })
    }

    fn sign_out<'a>(&'a self, _session: &'a Session) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(async move {
            self.restored.lock().take();
            Ok(())
        })
    }
}
