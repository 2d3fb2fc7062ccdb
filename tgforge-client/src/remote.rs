//! The remote client seam and the shape of what it returns.
//!
//! Everything the core needs from Telegram goes through [`RemoteClient`]:
//! connect, authorization check, send-code, verify-code, verify-password,
//! entity lookup and logout. Each call is awaited to completion by the
//! [`crate::EventLoopBridge`]; throttling and timeouts are the client's own.

use serde::{Deserialize, Serialize};

use crate::errors::{InvocationError, LoginToken, PasswordToken, SignInError};
use crate::Config;

// ─── RemoteClient ─────────────────────────────────────────────────────────────

/// An authenticated-or-not handle to the Telegram API.
///
/// The handle is owned exclusively by [`crate::SessionContext`] and released
/// only by a session reset.
#[allow(async_fn_in_trait)]
pub trait RemoteClient: Sized {
    /// Client-specific connection settings (transport, fixtures, …).
    type Options: Clone;

    /// Open a connection using the API credentials in `config`.
    async fn connect(config: &Config, options: &Self::Options) -> Result<Self, InvocationError>;

    /// Returns `true` if the stored session is already logged in.
    async fn is_authorized(&self) -> Result<bool, InvocationError>;

    /// Ask Telegram to deliver a login code to `phone`.
    async fn request_login_code(&self, phone: &str, force_sms: bool) -> Result<SentCode, InvocationError>;

    /// Complete sign-in with the code sent to the phone.
    async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), SignInError>;

    /// Complete 2FA login.
    async fn check_password(&self, token: PasswordToken, password: &str) -> Result<(), InvocationError>;

    /// Log out. `Ok(false)` means the session was already gone server-side.
    async fn sign_out(&self) -> Result<bool, InvocationError>;

    /// Resolve a numeric id to whatever peer it names.
    async fn get_entity(&self, id: i64) -> Result<RawEntity, InvocationError>;
}

// ─── SentCode ─────────────────────────────────────────────────────────────────

/// Server answer to `auth.sendCode`.
#[derive(Clone, Debug, PartialEq)]
pub struct SentCode {
    /// Delivery method constructor, e.g. `SentCodeTypeApp`.
    pub kind:            String,
    /// Method that `auth.resendCode` would switch to, e.g. `CodeTypeSms`.
    pub next_kind:       Option<String>,
    /// Seconds before the code may be resent.
    pub timeout:         Option<i32>,
    pub phone_code_hash: String,
}

// ─── Raw entities ─────────────────────────────────────────────────────────────

/// What a single id lookup resolved to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_", rename_all = "lowercase")]
pub enum RawEntity {
    User(RawUser),
    Chat { id: i64, title: String },
    Empty { id: i64 },
}

impl RawEntity {
    pub fn id(&self) -> i64 {
        match self {
            Self::User(u)        => u.id,
            Self::Chat { id, .. } => *id,
            Self::Empty { id }   => *id,
        }
    }

    /// Constructor family, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_)     => "user",
            Self::Chat { .. } => "chat",
            Self::Empty { .. } => "deleted or inaccessible peer",
        }
    }
}

/// A `user` constructor with every optional field defaulted.
///
/// Fields the server omits deserialize to `None`, `false` or empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawUser {
    pub id:             i64,
    pub access_hash:    Option<i64>,
    pub first_name:     Option<String>,
    pub last_name:      Option<String>,
    pub username:       Option<String>,
    /// Collectible / additional usernames.
    pub usernames:      Vec<RawUsername>,
    pub phone:          Option<String>,
    pub bot:            bool,
    pub verified:       bool,
    pub premium:        bool,
    pub scam:           bool,
    pub fake:           bool,
    pub restricted:     bool,
    pub deleted:        bool,
    pub support:        bool,
    pub contact:        bool,
    pub mutual_contact: bool,
    pub close_friend:   bool,
    pub stories_hidden: bool,
    pub status:         Option<RawUserStatus>,
    pub photo:          Option<RawProfilePhoto>,
    pub lang_code:      Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawUsername {
    pub username: String,
    pub editable: bool,
    pub active:   bool,
}

/// Presence as sent by the server.
///
/// `kind` is the constructor name, e.g. `UserStatusOnline` or
/// `UserStatusLastWeek`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawUserStatus {
    pub kind:       String,
    #[serde(default)]
    pub was_online: Option<i64>,
}

impl RawUserStatus {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), was_online: None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawProfilePhoto {
    pub photo_id: i64,
    pub dc_id:    i32,
}
