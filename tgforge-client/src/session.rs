//! Per-operator session state.
//!
//! [`SessionContext`] is the one value a host keeps between turns: the
//! credentials, the auth phase, the exclusively owned client handle, the
//! cancellation token and the event loop everything runs on. Login
//! operations live in [`crate::auth`], the batch entry point in
//! [`crate::fetch`].

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::bridge::EventLoopBridge;
use crate::errors::{CredentialError, LoginToken, PasswordToken};
use crate::remote::{RemoteClient, SentCode};
use crate::Config;

// ─── Credentials ──────────────────────────────────────────────────────────────

/// Validated API credentials plus the phone number they log in with.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub api_id:   i32,
    pub api_hash: String,
    /// Normalized to `+` followed by digits only.
    pub phone:    String,
}

impl Credentials {
    pub fn new(api_id: i32, api_hash: &str, phone: &str) -> Result<Self, CredentialError> {
        if api_id <= 0 {
            return Err(CredentialError::InvalidApiId(api_id.to_string()));
        }
        let api_hash = api_hash.trim();
        if api_hash.is_empty() || !api_hash.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CredentialError::InvalidApiHash);
        }
        Ok(Self {
            api_id,
            api_hash: api_hash.to_string(),
            phone:    normalize_phone(phone)?,
        })
    }

    /// Same API id / hash, so an existing connection can be reused.
    pub(crate) fn same_app(&self, other: &Self) -> bool {
        self.api_id == other.api_id && self.api_hash == other.api_hash
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("phone", &mask_phone(&self.phone))
            .finish()
    }
}

/// Parse the free-form API id field.
pub fn parse_api_id(raw: &str) -> Result<i32, CredentialError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CredentialError::InvalidApiId(raw.to_string())),
    }
}

/// `"+1 (222) 444-8888"` → `"+12224448888"`.
///
/// Separators (space, dash, dot, parentheses) are dropped; what remains
/// must be 7 to 15 digits with an optional leading `+`.
pub fn normalize_phone(raw: &str) -> Result<String, CredentialError> {
    let trimmed = raw.trim();
    let digits_part = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let mut digits = String::with_capacity(digits_part.len());
    for c in digits_part.chars() {
        match c {
            '0'..='9'                 => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(CredentialError::InvalidPhone(raw.to_string())),
        }
    }
    if !(7..=15).contains(&digits.len()) {
        return Err(CredentialError::InvalidPhone(raw.to_string()));
    }
    Ok(format!("+{digits}"))
}

/// Keep only the last four digits visible, for logs.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let keep = digits.len().min(4);
    let hidden = digits.len() - keep;
    let tail: String = digits[hidden..].iter().collect();
    format!("+{}{tail}", "*".repeat(hidden))
}

// ─── Auth phase ───────────────────────────────────────────────────────────────

/// Where the login flow currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    Unauthenticated,
    CodeRequested,
    TwoFactorRequired,
    Authenticated,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unauthenticated   => "unauthenticated",
            Self::CodeRequested     => "waiting for the login code",
            Self::TwoFactorRequired => "waiting for the 2FA password",
            Self::Authenticated     => "authenticated",
        })
    }
}

/// Metadata from a code request, kept for the operator's benefit.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeRequestResult {
    /// e.g. `SentCodeTypeApp`, `SentCodeTypeSms`.
    pub code_type:       String,
    pub next_type:       Option<String>,
    pub timeout_seconds: Option<i32>,
}

impl From<&SentCode> for CodeRequestResult {
    fn from(s: &SentCode) -> Self {
        Self {
            code_type:       s.kind.clone(),
            next_type:       s.next_kind.clone(),
            timeout_seconds: s.timeout,
        }
    }
}

/// The phase plus whatever token the next step needs.
pub(crate) enum Phase {
    Unauthenticated,
    CodeRequested { token: LoginToken, sent: CodeRequestResult },
    TwoFactorRequired { token: PasswordToken },
    Authenticated,
}

impl Phase {
    pub(crate) fn public(&self) -> AuthPhase {
        match self {
            Self::Unauthenticated          => AuthPhase::Unauthenticated,
            Self::CodeRequested { .. }     => AuthPhase::CodeRequested,
            Self::TwoFactorRequired { .. } => AuthPhase::TwoFactorRequired,
            Self::Authenticated            => AuthPhase::Authenticated,
        }
    }
}

// ─── SessionContext ───────────────────────────────────────────────────────────

/// Everything one operator's session owns.
///
/// The client handle is `Some` only while the phase is past
/// `Unauthenticated`; [`SessionContext::reset_session`] is the only way it
/// is released.
pub struct SessionContext<C: RemoteClient> {
    pub(crate) config:      Config,
    pub(crate) options:     C::Options,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) phase:       Phase,
    // Declared before `bridge` so the handle is dropped while its runtime
    // still exists.
    pub(crate) client:      Option<C>,
    pub(crate) cancel:      CancellationToken,
    pub(crate) bridge:      EventLoopBridge,
}

impl<C: RemoteClient> SessionContext<C> {
    /// Create the context on the host's first interaction.
    pub fn new(config: Config, options: C::Options) -> std::io::Result<Self> {
        let bridge = EventLoopBridge::new()?;
        Ok(Self::with_bridge(config, options, bridge))
    }

    pub(crate) fn with_bridge(config: Config, options: C::Options, bridge: EventLoopBridge) -> Self {
        Self {
            config,
            options,
            credentials: None,
            phase:       Phase::Unauthenticated,
            client:      None,
            cancel:      CancellationToken::new(),
            bridge,
        }
    }

    pub fn phase(&self) -> AuthPhase { self.phase.public() }

    pub fn is_authenticated(&self) -> bool { self.phase() == AuthPhase::Authenticated }

    pub fn credentials(&self) -> Option<&Credentials> { self.credentials.as_ref() }

    pub fn config(&self) -> &Config { &self.config }

    /// The client handle, if one is connected.
    pub fn client(&self) -> Option<&C> { self.client.as_ref() }

    /// Metadata of the last code request while a code is awaited.
    pub fn code_request(&self) -> Option<&CodeRequestResult> {
        match &self.phase {
            Phase::CodeRequested { sent, .. } => Some(sent),
            _ => None,
        }
    }

    /// The account's 2FA hint while a password is awaited.
    pub fn password_hint(&self) -> Option<&str> {
        match &self.phase {
            Phase::TwoFactorRequired { token } => token.hint(),
            _ => None,
        }
    }

    /// A handle the host can use to request cancellation of a running batch.
    pub fn cancel_token(&self) -> CancellationToken { self.cancel.clone() }

    /// Ask a running (or the next) batch to stop at its next identifier.
    pub fn request_cancel(&self) { self.cancel.cancel() }

    pub fn cancel_requested(&self) -> bool { self.cancel.is_cancelled() }

    /// Arm a fresh token so a new batch starts uncancelled.
    ///
    /// Clones handed out earlier keep pointing at the old token.
    pub fn clear_cancel(&mut self) {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
    }

    pub fn bridge(&self) -> &EventLoopBridge { &self.bridge }

    pub fn bridge_mut(&mut self) -> &mut EventLoopBridge { &mut self.bridge }
}

impl<C: RemoteClient> fmt::Debug for SessionContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("credentials", &self.credentials)
            .field("phase", &self.phase())
            .field("client", &self.client.is_some())
            .field("cancel_requested", &self.cancel_requested())
            .field("bridge", &self.bridge)
            .finish()
    }
}
