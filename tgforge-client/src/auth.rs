//! Login state machine.
//!
//! ```text
//! Unauthenticated ──submit_credentials──▶ CodeRequested ──submit_code──▶ Authenticated
//!        │                                      │                            ▲
//!        └──────────(already authorized)────────┼────────────────────────────┤
//!                                               └──▶ TwoFactorRequired ──submit_password
//! ```
//!
//! Every network step runs to completion on the session's
//! [`crate::EventLoopBridge`] before the call returns. On `Err` the phase is
//! exactly what it was before the call.

use crate::bridge::EventLoopBridge;
use crate::errors::{AuthError, CredentialError, InvocationError, LoginToken, SignInError};
use crate::remote::{RemoteClient, SentCode};
use crate::session::{mask_phone, AuthPhase, CodeRequestResult, Credentials, Phase, SessionContext};
use crate::Config;

/// Result of [`SessionContext::submit_credentials`].
#[derive(Clone, Debug, PartialEq)]
pub enum CredentialsOutcome {
    /// The stored session was already logged in; no code was requested.
    AlreadyAuthorized,
    /// A login code is on its way.
    CodeSent(CodeRequestResult),
}

impl<C: RemoteClient> SessionContext<C> {
    // ── Credentials ───────────────────────────────────────────────────────

    /// Connect and either finish immediately (already authorized) or request
    /// a login code.
    ///
    /// Allowed while unauthenticated and while waiting for a code or
    /// password, in which case the flow restarts with a new code over the
    /// existing connection. A different API id or hash is refused with
    /// [`AuthError::WrongPhase`] until [`reset_session`](Self::reset_session).
    pub fn submit_credentials(
        &mut self,
        api_id:   i32,
        api_hash: &str,
        phone:    &str,
    ) -> Result<CredentialsOutcome, AuthError> {
        if self.phase() == AuthPhase::Authenticated {
            return Err(AuthError::WrongPhase { operation: "submit_credentials", phase: self.phase() });
        }
        let creds = Credentials::new(api_id, api_hash, phone)?;

        // The held handle was connected with the old API id / hash and only
        // reset may release it.
        if let (Some(old), Some(_)) = (&self.credentials, &self.client) {
            if !old.same_app(&creds) {
                return Err(AuthError::WrongPhase {
                    operation: "changing the API credentials",
                    phase:     self.phase(),
                });
            }
        }
        let existing = self.client.take();
        let was_reused = existing.is_some();

        let config = Config {
            api_id:   creds.api_id,
            api_hash: creds.api_hash.clone(),
            ..self.config.clone()
        };

        tracing::info!("[tgforge] Connecting for {} …", mask_phone(&creds.phone));
        let result = self.bridge.run(connect_and_send_code::<C>(
            existing, &config, &self.options, &creds.phone,
        ));

        match result {
            Ok((client, None)) => {
                tracing::info!("[tgforge] Session already authorized ✓");
                self.client      = Some(client);
                self.credentials = Some(creds);
                self.phase       = Phase::Authenticated;
                Ok(CredentialsOutcome::AlreadyAuthorized)
            }
            Ok((client, Some(sent))) => {
                let info = CodeRequestResult::from(&sent);
                tracing::info!("[tgforge] Login code sent via {}", info.code_type);
                let token = LoginToken::new(creds.phone.clone(), sent.phone_code_hash);
                self.client      = Some(client);
                self.credentials = Some(creds);
                self.phase       = Phase::CodeRequested { token, sent: info.clone() };
                Ok(CredentialsOutcome::CodeSent(info))
            }
            Err((client, e)) => {
                if was_reused {
                    self.client = client;
                }
                tracing::warn!("[tgforge] Connect / code request failed: {e}");
                Err(classify_connect_error(e, &creds))
            }
        }
    }

    // ── Code ──────────────────────────────────────────────────────────────

    /// Verify the login code.
    ///
    /// Moves to `Authenticated`, or to `TwoFactorRequired` when the account
    /// has a cloud password. A rejected code leaves the phase unchanged.
    pub fn submit_code(&mut self, code: &str) -> Result<AuthPhase, AuthError> {
        let Phase::CodeRequested { token, .. } = &self.phase else {
            return Err(AuthError::WrongPhase { operation: "submit_code", phase: self.phase() });
        };
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::Challenge("Enter the code you received.".into()));
        }
        let client = self.client.as_ref().ok_or(AuthError::Transport(InvocationError::Dropped))?;

        let result = self.bridge.run(client.sign_in(token, code));
        match result {
            Ok(()) => {
                tracing::info!("[tgforge] Signed in ✓");
                self.phase = Phase::Authenticated;
            }
            Err(SignInError::PasswordRequired(token)) => {
                tracing::info!("[tgforge] 2FA password required");
                self.phase = Phase::TwoFactorRequired { token };
            }
            Err(SignInError::InvalidCode) => {
                return Err(AuthError::Challenge("Invalid or expired code. Please try again.".into()));
            }
            Err(SignInError::SignUpRequired) => {
                return Err(AuthError::Challenge(
                    "This number is not registered. Sign up via the official Telegram app first.".into(),
                ));
            }
            Err(SignInError::Other(e)) => return Err(classify_challenge_error(e, "code")),
        }
        Ok(self.phase())
    }

    // ── Password ──────────────────────────────────────────────────────────

    /// Verify the 2FA password. Only valid while `TwoFactorRequired`.
    pub fn submit_password(&mut self, password: &str) -> Result<AuthPhase, AuthError> {
        let Phase::TwoFactorRequired { token } = &self.phase else {
            return Err(AuthError::WrongPhase { operation: "submit_password", phase: self.phase() });
        };
        if password.is_empty() {
            return Err(AuthError::Challenge("Enter your 2FA password.".into()));
        }
        let client = self.client.as_ref().ok_or(AuthError::Transport(InvocationError::Dropped))?;

        let result = self.bridge.run(client.check_password(token.clone(), password));
        match result {
            Ok(()) => {
                tracing::info!("[tgforge] 2FA ✓");
                self.phase = Phase::Authenticated;
                Ok(self.phase())
            }
            Err(e) => Err(classify_challenge_error(e, "password")),
        }
    }

    // ── Reset ─────────────────────────────────────────────────────────────

    /// Log out (best effort), wipe session artifacts and start over.
    ///
    /// Never fails: a logout or deletion fault is logged and ignored, and the
    /// context always ends up `Unauthenticated` with a fresh event loop.
    pub fn reset_session(&mut self) {
        if let Some(client) = self.client.as_ref() {
            match self.bridge.run(client.sign_out()) {
                Ok(_)  => tracing::info!("[tgforge] Signed out ✓"),
                Err(e) => tracing::warn!("[tgforge] Logout failed during reset ({e}), continuing"),
            }
        }

        let backend = self.config.session_backend.clone();
        if let Err(e) = backend.delete() {
            tracing::warn!("[tgforge] Could not delete {} session artifacts: {e}", backend.name());
        }

        let config = self.config.clone();
        match EventLoopBridge::new() {
            Ok(bridge) => {
                let options = self.options.clone();
                let old = std::mem::replace(self, Self::with_bridge(config, options, bridge));
                drop(old);
            }
            Err(e) => {
                tracing::warn!("[tgforge] Could not recreate event loop ({e}), keeping the current one");
                self.credentials = None;
                self.phase       = Phase::Unauthenticated;
                self.client      = None;
                self.cancel      = tokio_util::sync::CancellationToken::new();
            }
        }
        tracing::info!("[tgforge] Session reset");
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

type ConnectResult<C> = Result<(C, Option<SentCode>), (Option<C>, InvocationError)>;

/// Connect (unless a handle is supplied), check authorization, and request a
/// code if needed. The handle travels back with the error so a reused
/// connection is never lost.
async fn connect_and_send_code<C: RemoteClient>(
    existing: Option<C>,
    config:   &Config,
    options:  &C::Options,
    phone:    &str,
) -> ConnectResult<C> {
    let client = match existing {
        Some(c) => c,
        None    => C::connect(config, options).await.map_err(|e| (None, e))?,
    };

    match client.is_authorized().await {
        Ok(true)  => return Ok((client, None)),
        Ok(false) => {}
        Err(e)    => return Err((Some(client), e)),
    }

    match client.request_login_code(phone, config.force_sms).await {
        Ok(sent) => Ok((client, Some(sent))),
        Err(e)   => Err((Some(client), e)),
    }
}

fn classify_connect_error(e: InvocationError, creds: &Credentials) -> AuthError {
    if e.is("PHONE_NUMBER_INVALID") || e.is("PHONE_NUMBER_BANNED") {
        AuthError::Credential(CredentialError::InvalidPhone(creds.phone.clone()))
    } else if e.is("API_ID_INVALID") || e.is("API_ID_PUBLISHED_FLOOD") {
        AuthError::Credential(CredentialError::InvalidApiId(creds.api_id.to_string()))
    } else {
        AuthError::Transport(e)
    }
}

/// Server-side rejections are challenge errors the operator can retry;
/// connection-level faults stay transport errors.
fn classify_challenge_error(e: InvocationError, what: &str) -> AuthError {
    match e {
        InvocationError::Rpc(r) if r.is("PASSWORD_HASH_INVALID") =>
            AuthError::Challenge("Incorrect password. Please try again.".into()),
        InvocationError::Rpc(r) if r.is("PHONE_CODE_*") =>
            AuthError::Challenge("Invalid or expired code. Please try again.".into()),
        InvocationError::Rpc(r) => AuthError::Challenge(format!("The {what} was rejected: {r}")),
        other => AuthError::Transport(other),
    }
}
