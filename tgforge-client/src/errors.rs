//! Error types for tgforge-client.
//!
//! Remote faults arrive as [`InvocationError`]; the login flow wraps them in
//! [`AuthError`] and the batch fetcher in [`FetchError`].

use std::{fmt, io};

use crate::fetch::RawId;

// ─── RpcError ─────────────────────────────────────────────────────────────────

/// An error returned by Telegram's servers in response to an RPC call.
///
/// Numeric values are stripped from the name and placed in [`RpcError::value`].
///
/// # Example
/// `FLOOD_WAIT_30` → `RpcError { code: 420, name: "FLOOD_WAIT", value: Some(30) }`
#[derive(Clone, Debug, PartialEq)]
pub struct RpcError {
    /// HTTP-like status code.
    pub code: i32,
    /// Error name in SCREAMING_SNAKE_CASE with digits removed.
    pub name: String,
    /// Numeric suffix extracted from the name, if any.
    pub value: Option<u32>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC {}: {}", self.code, self.name)?;
        if let Some(v) = self.value {
            write!(f, " (value: {v})")?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

impl RpcError {
    /// Parse a raw Telegram error message like `"FLOOD_WAIT_30"` into an `RpcError`.
    pub fn from_telegram(code: i32, message: &str) -> Self {
        if let Some(idx) = message.rfind('_') {
            let suffix = &message[idx + 1..];
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(v) = suffix.parse::<u32>() {
                    let name = message[..idx].to_string();
                    return Self { code, name, value: Some(v) };
                }
            }
        }
        Self { code, name: message.to_string(), value: None }
    }

    /// Match on the error name, with optional wildcard prefix/suffix `'*'`.
    ///
    /// # Examples
    /// - `err.is("FLOOD_WAIT")` — exact match
    /// - `err.is("PHONE_CODE_*")` — starts-with match
    /// - `err.is("*_INVALID")` — ends-with match
    pub fn is(&self, pattern: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.name.starts_with(prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.name.ends_with(suffix)
        } else {
            self.name == pattern
        }
    }
}

// ─── InvocationError ──────────────────────────────────────────────────────────

/// The error type returned from any [`crate::RemoteClient`] call.
///
/// Connect and authorization-check failures surface to the operator as
/// transport errors; the auth phase never advances on one.
#[derive(Debug)]
pub enum InvocationError {
    /// Telegram rejected the request.
    Rpc(RpcError),
    /// Network / I/O failure.
    Io(io::Error),
    /// The response did not have the expected shape.
    Protocol(String),
    /// The request was dropped (e.g. the connection shut down mid-call).
    Dropped,
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc(e)       => write!(f, "{e}"),
            Self::Io(e)        => write!(f, "I/O error: {e}"),
            Self::Protocol(s)  => write!(f, "protocol error: {s}"),
            Self::Dropped      => write!(f, "request dropped"),
        }
    }
}

impl std::error::Error for InvocationError {}

impl From<io::Error> for InvocationError {
    fn from(e: io::Error) -> Self { Self::Io(e) }
}

impl From<RpcError> for InvocationError {
    fn from(e: RpcError) -> Self { Self::Rpc(e) }
}

impl InvocationError {
    /// Returns `true` if this is the named RPC error (supports `'*'` wildcards).
    pub fn is(&self, pattern: &str) -> bool {
        match self {
            Self::Rpc(e) => e.is(pattern),
            _            => false,
        }
    }
}

// ─── SignInError ──────────────────────────────────────────────────────────────

/// Errors returned by [`crate::RemoteClient::sign_in`].
#[derive(Debug)]
pub enum SignInError {
    /// The phone number is new — must sign up via the official Telegram app first.
    SignUpRequired,
    /// 2FA is enabled; the contained token must be passed to
    /// [`crate::RemoteClient::check_password`].
    PasswordRequired(PasswordToken),
    /// The code entered was wrong or has expired.
    InvalidCode,
    /// Any other error.
    Other(InvocationError),
}

impl fmt::Display for SignInError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignUpRequired       => write!(f, "sign up required — use official Telegram app"),
            Self::PasswordRequired(_)  => write!(f, "2FA password required"),
            Self::InvalidCode          => write!(f, "invalid or expired code"),
            Self::Other(e)             => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SignInError {}

impl From<InvocationError> for SignInError {
    fn from(e: InvocationError) -> Self { Self::Other(e) }
}

// ─── PasswordToken ────────────────────────────────────────────────────────────

/// Opaque 2FA challenge token returned in [`SignInError::PasswordRequired`].
///
/// Pass to [`crate::RemoteClient::check_password`] together with the user's password.
#[derive(Clone, PartialEq)]
pub struct PasswordToken {
    pub(crate) hint: Option<String>,
}

impl PasswordToken {
    pub fn new(hint: Option<String>) -> Self {
        Self { hint }
    }

    /// The password hint set by the account owner, if any.
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

impl fmt::Debug for PasswordToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordToken {{ hint: {:?} }}", self.hint())
    }
}

// ─── LoginToken ───────────────────────────────────────────────────────────────

/// Opaque token produced by a code request.
///
/// Pass to [`crate::RemoteClient::sign_in`] with the received code.
#[derive(Clone, PartialEq)]
pub struct LoginToken {
    pub(crate) phone:           String,
    pub(crate) phone_code_hash: String,
}

impl LoginToken {
    pub fn new(phone: impl Into<String>, phone_code_hash: impl Into<String>) -> Self {
        Self { phone: phone.into(), phone_code_hash: phone_code_hash.into() }
    }

    pub fn phone(&self) -> &str { &self.phone }

    pub fn phone_code_hash(&self) -> &str { &self.phone_code_hash }
}

impl fmt::Debug for LoginToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoginToken {{ phone: {:?} }}", crate::session::mask_phone(&self.phone))
    }
}

// ─── CredentialError ──────────────────────────────────────────────────────────

/// Malformed operator input. Nothing is sent and the phase does not move.
#[derive(Clone, Debug, PartialEq)]
pub enum CredentialError {
    InvalidApiId(String),
    InvalidApiHash,
    InvalidPhone(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidApiId(raw) => write!(f, "API ID must be a positive integer, got {raw:?}"),
            Self::InvalidApiHash    => write!(f, "API hash must be a non-empty alphanumeric string"),
            Self::InvalidPhone(_)   => write!(f, "Invalid phone number. Please check and try again."),
        }
    }
}

impl std::error::Error for CredentialError {}

// ─── AuthError ────────────────────────────────────────────────────────────────

/// Errors returned by the [`crate::SessionContext`] login operations.
///
/// None of these leave the session half-transitioned: the phase reported
/// after an `Err` is the phase that was current before the call.
#[derive(Debug)]
pub enum AuthError {
    /// Malformed API id / hash / phone (locally or per the server).
    Credential(CredentialError),
    /// Rejected code or password; the operator may try again.
    Challenge(String),
    /// Connect, authorization check or code request failed.
    Transport(InvocationError),
    /// The operation is not valid in the current auth phase.
    WrongPhase { operation: &'static str, phase: crate::AuthPhase },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential(e)  => write!(f, "{e}"),
            Self::Challenge(msg) => write!(f, "{msg}"),
            Self::Transport(e)   => write!(f, "Error: {e}"),
            Self::WrongPhase { operation, phase } =>
                write!(f, "{operation} is not allowed while {phase}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<CredentialError> for AuthError {
    fn from(e: CredentialError) -> Self { Self::Credential(e) }
}

impl From<InvocationError> for AuthError {
    fn from(e: InvocationError) -> Self { Self::Transport(e) }
}

// ─── FetchError ───────────────────────────────────────────────────────────────

/// A fault confined to one identifier of a batch.
#[derive(Debug)]
pub enum FetchError {
    /// The identifier could not be coerced to an integer.
    InvalidId { raw: RawId, reason: String },
    /// The id resolved to something other than a user account.
    NotAUser { id: i64, kind: &'static str },
    /// The remote lookup failed.
    Lookup { id: i64, source: InvocationError },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId { reason, .. } => write!(f, "Invalid ID format: {reason}"),
            Self::NotAUser { id, kind }    => write!(f, "{id} is a {kind}, not a user"),
            Self::Lookup { source, .. }    => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Lookup { source, .. } => Some(source),
            _                           => None,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
