use std::sync::Arc;

use foundation::{BoxFuture, UserId};
use reqwest::StatusCode;
use runtime::{AuthBackend, AuthError, Session, SignUpOutcome};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::RestConfig;

/// Password auth against a GoTrue-style `/auth/v1` endpoint.
///
/// Sessions are not persisted between runs, so `restore` always reports none.
pub struct RestAuth {
    http: reqwest::Client,
    config: Arc<RestConfig>,
}

impl RestAuth {
    pub fn new(config: RestConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

/// Token grant and sign-up share this shape; sign-up omits the token when
/// the address still needs confirming.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    user: Option<AuthUser>,
    // Sign-up without a session returns the user object at the top level.
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

fn auth_error(status: StatusCode, body: &str) -> AuthError {
    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .unwrap_or_else(|| status.to_string());
    let lower = message.to_ascii_lowercase();
    if lower.contains("email not confirmed") {
        AuthError::EmailNotConfirmed
    } else if lower.contains("invalid login credentials") {
        AuthError::InvalidCredentials
    } else if lower.contains("already registered") {
        AuthError::AlreadyRegistered
    } else {
        AuthError::Backend(message)
    }
}

fn session_from(resp: AuthResponse) -> Option<Session> {
    let token = resp.access_token?;
    let user = resp.user?;
    Some(Session {
        user_id: UserId::new(user.id),
        email: user.email,
        access_token: token,
    })
}

impl RestAuth {
    async fn post(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: serde_json::Value,
    ) -> Result<Option<AuthResponse>, AuthError> {
        let mut req = self
            .http
            .post(self.config.auth_url(path))
            .header("apikey", &self.config.api_key)
            .json(&body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| AuthError::Backend(format!("request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(auth_error(status, &text));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        resp.json::<AuthResponse>()
            .await
            .map(Some)
            .map_err(|e| AuthError::Backend(format!("failed to decode response: {e}")))
    }
}

impl AuthBackend for RestAuth {
    fn restore(&self) -> BoxFuture<'_, Result<Option<Session>, AuthError>> {
        Box::pin(async move { Ok(None) })
    }

    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Session, AuthError>> {
        Box::pin(async move {
            let resp = self
                .post(
                    "token?grant_type=password",
                    None,
                    json!({ "email": email, "password": password }),
                )
                .await?
                .ok_or_else(|| AuthError::Backend("empty token response".to_string()))?;
            session_from(resp).ok_or_else(|| AuthError::Backend("token response without session".into()))
        })
    }

    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<SignUpOutcome, AuthError>> {
        Box::pin(async move {
            let display_name = email.split('@').next().unwrap_or(email);
            let resp = self
                .post(
                    "signup",
                    None,
                    json!({
                        "email": email,
                        "password": password,
                        "data": { "email": email, "full_name": display_name },
                    }),
                )
                .await?
                .ok_or_else(|| AuthError::Backend("empty sign-up response".to_string()))?;
            let created = resp.id.is_some() || resp.user.is_some();
            match session_from(resp) {
                Some(session) => Ok(SignUpOutcome::SignedIn(session)),
                None if created => {
                    debug!("sign-up for {email} awaits confirmation");
                    Ok(SignUpOutcome::ConfirmationRequired)
                }
                None => Err(AuthError::Backend("sign-up returned no user".to_string())),
            }
        })
    }

    fn sign_out<'a>(&'a self, session: &'a Session) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(async move {
            self.post("logout", Some(&session.access_token), json!({}))
                .await
                .map(|_| ())
        })
    }
}
