//! Scripted in-process client with fault injection.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tgforge_client::{
    Config, InMemoryBackend, InvocationError, LoginToken, PasswordToken, RawEntity, RawUser,
    RemoteClient, RpcError, SentCode, SessionContext, SignInError,
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct Script {
    pub authorized:      AtomicBool,
    pub fail_connect:    AtomicBool,
    pub fail_logout:     AtomicBool,
    pub invalid_phone:   AtomicBool,
    pub password:        Mutex<Option<String>>,
    pub code:            Mutex<String>,
    pub users:           Mutex<HashMap<i64, RawEntity>>,
    pub failing_ids:     Mutex<HashSet<i64>>,
    /// Cancel this token once `cancel_after` lookups have completed.
    pub cancel:          Mutex<Option<(CancellationToken, usize)>>,
    pub connects:        AtomicUsize,
    pub code_requests:   AtomicUsize,
    pub logouts:         AtomicUsize,
    /// Client handles dropped so far.
    pub drops:           AtomicUsize,
    pub looked_up:       Mutex<Vec<i64>>,
}

impl Script {
    pub fn new() -> Arc<Self> {
        let s = Self::default();
        *s.code.lock().unwrap() = "24680".into();
        Arc::new(s)
    }

    pub fn with_users(ids: &[i64]) -> Arc<Self> {
        let s = Self::new();
        {
            let mut users = s.users.lock().unwrap();
            for &id in ids {
                users.insert(id, RawEntity::User(RawUser { id, ..Default::default() }));
            }
        }
        s
    }

    pub fn looked_up(&self) -> Vec<i64> {
        self.looked_up.lock().unwrap().clone()
    }
}

pub struct ScriptedClient {
    script: Arc<Script>,
}

impl Drop for ScriptedClient {
    fn drop(&mut self) {
        self.script.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn rpc(code: i32, name: &str) -> InvocationError {
    InvocationError::Rpc(RpcError::from_telegram(code, name))
}

impl RemoteClient for ScriptedClient {
    type Options = Arc<Script>;

    async fn connect(_config: &Config, script: &Arc<Script>) -> Result<Self, InvocationError> {
        script.connects.fetch_add(1, Ordering::SeqCst);
        if script.fail_connect.load(Ordering::SeqCst) {
            return Err(InvocationError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        Ok(Self { script: script.clone() })
    }

    async fn is_authorized(&self) -> Result<bool, InvocationError> {
        Ok(self.script.authorized.load(Ordering::SeqCst))
    }

    async fn request_login_code(&self, _phone: &str, force_sms: bool) -> Result<SentCode, InvocationError> {
        self.script.code_requests.fetch_add(1, Ordering::SeqCst);
        if self.script.invalid_phone.load(Ordering::SeqCst) {
            return Err(rpc(400, "PHONE_NUMBER_INVALID"));
        }
        Ok(SentCode {
            kind:            if force_sms { "SentCodeTypeSms" } else { "SentCodeTypeApp" }.into(),
            next_kind:       Some("CodeTypeCall".into()),
            timeout:         Some(60),
            phone_code_hash: "hash".into(),
        })
    }

    async fn sign_in(&self, _token: &LoginToken, code: &str) -> Result<(), SignInError> {
        if code == "expired" {
            return Err(SignInError::Other(rpc(400, "PHONE_CODE_EXPIRED")));
        }
        if code != *self.script.code.lock().unwrap() {
            return Err(SignInError::InvalidCode);
        }
        if self.script.password.lock().unwrap().is_some() {
            return Err(SignInError::PasswordRequired(PasswordToken::new(Some("pet".into()))));
        }
        self.script.authorized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn check_password(&self, _token: PasswordToken, password: &str) -> Result<(), InvocationError> {
        if self.script.password.lock().unwrap().as_deref() == Some(password) {
            self.script.authorized.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(rpc(400, "PASSWORD_HASH_INVALID"))
        }
    }

    async fn sign_out(&self) -> Result<bool, InvocationError> {
        self.script.logouts.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_logout.load(Ordering::SeqCst) {
            return Err(InvocationError::Dropped);
        }
        self.script.authorized.store(false, Ordering::SeqCst);
        Ok(true)
    }

    async fn get_entity(&self, id: i64) -> Result<RawEntity, InvocationError> {
        self.script.looked_up.lock().unwrap().push(id);
        tokio::task::yield_now().await;

        let result = if self.script.failing_ids.lock().unwrap().contains(&id) {
            Err(rpc(420, "FLOOD_WAIT_7"))
        } else {
            self.script.users.lock().unwrap().get(&id).cloned().ok_or_else(|| rpc(400, "PEER_ID_INVALID"))
        };

        if let Some((token, after)) = self.script.cancel.lock().unwrap().as_ref() {
            if self.script.looked_up.lock().unwrap().len() >= *after {
                token.cancel();
            }
        }
        result
    }
}

pub fn config(backend: Arc<InMemoryBackend>) -> Config {
    Config { session_backend: backend, ..Default::default() }
}

pub fn session(script: &Arc<Script>) -> SessionContext<ScriptedClient> {
    SessionContext::new(config(Arc::new(InMemoryBackend::new())), script.clone()).unwrap()
}

/// A session that has gone through phone + code.
pub fn authenticated(script: &Arc<Script>) -> SessionContext<ScriptedClient> {
    let mut s = session(script);
    s.submit_credentials(1001, "abc123", "+1 222 444 8888").unwrap();
    s.submit_code("24680").unwrap();
    assert!(s.is_authenticated());
    s
}
