//! Fixture-driven [`RemoteClient`].
//!
//! Replays a scripted account from JSON so the whole login + fetch flow can
//! run offline:
//!
//! ```json
//! {
//!   "authorized": false,
//!   "code": "12345",
//!   "password": "hunter2",
//!   "password_hint": "the usual",
//!   "code_type": "SentCodeTypeApp",
//!   "latency_ms": 50,
//!   "users": [{ "id": 42, "first_name": "Ada", "username": "ada" }],
//!   "chats": [{ "id": 77, "title": "Some channel" }]
//! }
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{InvocationError, LoginToken, PasswordToken, RpcError, SignInError};
use crate::remote::{RawEntity, RawUser, RemoteClient, SentCode};
use crate::Config;

// ─── Script ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ReplayScript {
    /// The stored session is already logged in.
    pub authorized:     bool,
    pub code:           String,
    /// Cloud password; `None` means 2FA is off.
    pub password:       Option<String>,
    pub password_hint:  Option<String>,
    pub code_type:      String,
    pub next_type:      Option<String>,
    pub timeout:        Option<i32>,
    /// Phones the server rejects as `PHONE_NUMBER_INVALID`.
    pub invalid_phones: Vec<String>,
    /// Artificial delay per call.
    pub latency_ms:     u64,
    pub users:          Vec<RawUser>,
    pub chats:          Vec<ReplayChat>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReplayChat {
    pub id:    i64,
    pub title: String,
}

impl Default for ReplayScript {
    fn default() -> Self {
        Self {
            authorized:     false,
            code:           "12345".into(),
            password:       None,
            password_hint:  None,
            code_type:      "SentCodeTypeApp".into(),
            next_type:      Some("CodeTypeSms".into()),
            timeout:        None,
            invalid_phones: Vec::new(),
            latency_ms:     0,
            users:          Vec::new(),
            chats:          Vec::new(),
        }
    }
}

impl ReplayScript {
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

// ─── ReplayClient ─────────────────────────────────────────────────────────────

pub struct ReplayClient {
    script:     Arc<ReplayScript>,
    authorized: AtomicBool,
    lookups:    AtomicUsize,
}

impl ReplayClient {
    /// Number of `get_entity` calls served so far.
    pub fn lookups(&self) -> usize { self.lookups.load(Ordering::SeqCst) }

    async fn delay(&self) {
        if self.script.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.script.latency_ms)).await;
        }
    }
}

fn rpc(code: i32, name: &str) -> InvocationError {
    InvocationError::Rpc(RpcError::from_telegram(code, name))
}

impl RemoteClient for ReplayClient {
    type Options = Arc<ReplayScript>;

    async fn connect(config: &Config, script: &Arc<ReplayScript>) -> Result<Self, InvocationError> {
        if config.api_id <= 0 {
            return Err(rpc(400, "API_ID_INVALID"));
        }
        tracing::debug!("[tgforge] Replay client connected ({} users)", script.users.len());
        Ok(Self {
            script:     script.clone(),
            authorized: AtomicBool::new(script.authorized),
            lookups:    AtomicUsize::new(0),
        })
    }

    async fn is_authorized(&self) -> Result<bool, InvocationError> {
        self.delay().await;
        Ok(self.authorized.load(Ordering::SeqCst))
    }

    async fn request_login_code(&self, phone: &str, force_sms: bool) -> Result<SentCode, InvocationError> {
        self.delay().await;
        if self.script.invalid_phones.iter().any(|p| p == phone) {
            return Err(rpc(400, "PHONE_NUMBER_INVALID"));
        }
        let kind = if force_sms { "SentCodeTypeSms".to_string() } else { self.script.code_type.clone() };
        Ok(SentCode {
            kind,
            next_kind:       self.script.next_type.clone(),
            timeout:         self.script.timeout,
            phone_code_hash: format!("replay-{}", phone.len()),
        })
    }

    async fn sign_in(&self, _token: &LoginToken, code: &str) -> Result<(), SignInError> {
        self.delay().await;
        if code.trim() != self.script.code {
            return Err(SignInError::InvalidCode);
        }
        if self.script.password.is_some() {
            return Err(SignInError::PasswordRequired(PasswordToken::new(self.script.password_hint.clone())));
        }
        self.authorized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn check_password(&self, _token: PasswordToken, password: &str) -> Result<(), InvocationError> {
        self.delay().await;
        match &self.script.password {
            Some(expected) if expected == password => {
                self.authorized.store(true, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(rpc(400, "PASSWORD_HASH_INVALID")),
        }
    }

    async fn sign_out(&self) -> Result<bool, InvocationError> {
        self.delay().await;
        Ok(self.authorized.swap(false, Ordering::SeqCst))
    }

    async fn get_entity(&self, id: i64) -> Result<RawEntity, InvocationError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if !self.authorized.load(Ordering::SeqCst) {
            return Err(rpc(401, "AUTH_KEY_UNREGISTERED"));
        }
        if let Some(user) = self.script.users.iter().find(|u| u.id == id) {
            return Ok(RawEntity::User(user.clone()));
        }
        if let Some(chat) = self.script.chats.iter().find(|c| c.id == id) {
            return Ok(RawEntity::Chat { id: chat.id, title: chat.title.clone() });
        }
        Err(rpc(400, "PEER_ID_INVALID"))
    }
}
