//! # tgforge-client
//!
//! Log an operator into Telegram and pull structured records for a batch of
//! user ids, from a host that can only make synchronous calls.
//!
//! ## Features
//! - Login state machine: phone → code → optional 2FA password
//! - One persistent event loop per session, blocked on per host turn
//! - Sequential batch lookup with cooperative cancellation and per-item
//!   error isolation
//! - Deterministic user normalization with fixed sentinels
//! - CSV / JSON export with link-safe naming
//! - Best-effort logout + artifact wipe on reset
//! - Offline replay client for fixtures and tests
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use tgforge_client::{Config, CredentialsOutcome, RawId, SessionContext};
//! use tgforge_client::replay::{ReplayClient, ReplayScript};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let script = Arc::new(ReplayScript::default());
//! let mut session = SessionContext::<ReplayClient>::new(Config::default(), script)?;
//!
//! if let CredentialsOutcome::CodeSent(_) = session.submit_credentials(12345, "abcdef", "+1 222 444 8888")? {
//!     session.submit_code("12345")?;
//! }
//! let outcome = session.fetch_users(&[RawId::from(" 42 ")], &mut ())?;
//! println!("{} rows", outcome.len());
//! # Ok(()) }
//! ```

#![deny(unsafe_code)]

pub mod auth;
pub mod bridge;
pub mod errors;
pub mod export;
pub mod fetch;
pub mod normalize;
pub mod remote;
pub mod replay;
pub mod session;
pub mod session_backend;

pub use auth::CredentialsOutcome;
pub use bridge::EventLoopBridge;
pub use errors::{
    AuthError, CredentialError, FetchError, InvocationError, LoginToken, PasswordToken, RpcError,
    SignInError,
};
pub use fetch::{BatchFetcher, ErrorRecord, FetchObserver, FetchOutcome, RawId, Row};
pub use normalize::{normalize_user, Flag, PhotoRef, UserRecord, UserStatus};
pub use remote::{RawEntity, RawUser, RemoteClient, SentCode};
pub use session::{AuthPhase, CodeRequestResult, Credentials, SessionContext};
pub use session_backend::{FileBackend, InMemoryBackend, SessionBackend};

use std::path::PathBuf;
use std::sync::Arc;

// ─── Config ───────────────────────────────────────────────────────────────────

/// Configuration for a [`SessionContext`] and the client it connects.
#[derive(Clone)]
pub struct Config {
    pub api_id:          i32,
    pub api_hash:        String,
    /// Stem of the session file (`<session_name>.session`).
    pub session_name:    String,
    pub session_dir:     PathBuf,
    /// Ask for the login code over SMS instead of the app.
    pub force_sms:       bool,
    /// Where session artifacts live; wiped on reset.
    pub session_backend: Arc<dyn SessionBackend>,
}

impl Config {
    /// Default config with a file backend rooted at `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>, session_name: &str) -> Self {
        let dir = dir.into();
        Self {
            session_name:    session_name.to_string(),
            session_backend: Arc::new(FileBackend::new(&dir, session_name)),
            session_dir:     dir,
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_id:          0,
            api_hash:        String::new(),
            session_name:    "tgforge".into(),
            session_dir:     PathBuf::from("."),
            force_sms:       false,
            session_backend: Arc::new(FileBackend::new(".", "tgforge")),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_id", &self.api_id)
            .field("session_name", &self.session_name)
            .field("session_dir", &self.session_dir)
            .field("force_sms", &self.force_sms)
            .field("session_backend", &self.session_backend.name())
            .finish()
    }
}
