mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{authenticated, config, session, Script, ScriptedClient};
use tgforge_client::{
    AuthError, AuthPhase, CredentialError, CredentialsOutcome, InMemoryBackend, SessionBackend,
    SessionContext,
};

#[test]
fn fresh_session_is_unauthenticated() {
    let s = session(&Script::new());
    assert_eq!(s.phase(), AuthPhase::Unauthenticated);
    assert!(s.client().is_none());
    assert!(s.credentials().is_none());
    assert!(!s.cancel_requested());
}

#[test]
fn credentials_request_a_code() {
    let script = Script::new();
    let mut s = session(&script);

    let out = s.submit_credentials(1001, "abc123", "+1 222 444 8888").unwrap();
    let CredentialsOutcome::CodeSent(info) = out else { panic!("expected a code request") };
    assert_eq!(info.code_type, "SentCodeTypeApp");
    assert_eq!(info.next_type.as_deref(), Some("CodeTypeCall"));
    assert_eq!(info.timeout_seconds, Some(60));

    assert_eq!(s.phase(), AuthPhase::CodeRequested);
    assert_eq!(s.code_request(), Some(&info));
    assert!(s.client().is_some());
    assert_eq!(s.credentials().unwrap().phone, "+12224448888");
}

#[test]
fn force_sms_is_forwarded() {
    let script = Script::new();
    let backend = Arc::new(InMemoryBackend::new());
    let cfg = tgforge_client::Config { force_sms: true, ..config(backend) };
    let mut s = SessionContext::<ScriptedClient>::new(cfg, script.clone()).unwrap();

    match s.submit_credentials(1001, "abc123", "+12224448888").unwrap() {
        CredentialsOutcome::CodeSent(info) => assert_eq!(info.code_type, "SentCodeTypeSms"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn already_authorized_skips_code_request() {
    let script = Script::new();
    script.authorized.store(true, Ordering::SeqCst);
    let mut s = session(&script);

    let out = s.submit_credentials(1001, "abc123", "+12224448888").unwrap();
    assert_eq!(out, CredentialsOutcome::AlreadyAuthorized);
    assert_eq!(s.phase(), AuthPhase::Authenticated);
    assert!(s.code_request().is_none());
    assert_eq!(script.code_requests.load(Ordering::SeqCst), 0);
}

#[test]
fn malformed_phone_is_rejected_locally() {
    let script = Script::new();
    let mut s = session(&script);

    let err = s.submit_credentials(1001, "abc123", "call me maybe").unwrap_err();
    assert!(matches!(err, AuthError::Credential(CredentialError::InvalidPhone(_))));
    assert_eq!(s.phase(), AuthPhase::Unauthenticated);
    assert!(s.client().is_none());
    assert_eq!(script.connects.load(Ordering::SeqCst), 0);
}

#[test]
fn server_rejected_phone_is_a_credential_error() {
    let script = Script::new();
    script.invalid_phone.store(true, Ordering::SeqCst);
    let mut s = session(&script);

    let err = s.submit_credentials(1001, "abc123", "+12224448888").unwrap_err();
    assert!(matches!(err, AuthError::Credential(CredentialError::InvalidPhone(_))));
    assert_eq!(err.to_string(), "Invalid phone number. Please check and try again.");
    assert_eq!(s.phase(), AuthPhase::Unauthenticated);
    assert!(s.client().is_none());
}

#[test]
fn connect_failure_leaves_phase_unchanged() {
    let script = Script::new();
    script.fail_connect.store(true, Ordering::SeqCst);
    let mut s = session(&script);

    let err = s.submit_credentials(1001, "abc123", "+12224448888").unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)));
    assert_eq!(s.phase(), AuthPhase::Unauthenticated);
    assert!(s.client().is_none());

    // Operator retries once the network is back.
    script.fail_connect.store(false, Ordering::SeqCst);
    assert!(s.submit_credentials(1001, "abc123", "+12224448888").is_ok());
    assert_eq!(s.phase(), AuthPhase::CodeRequested);
}

#[test]
fn resubmitting_reuses_the_connection() {
    let script = Script::new();
    let mut s = session(&script);
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();
    s.submit_credentials(1001, "abc123", "+12224448889").unwrap();
    assert_eq!(script.connects.load(Ordering::SeqCst), 1);
    assert_eq!(script.code_requests.load(Ordering::SeqCst), 2);
    assert_eq!(script.drops.load(Ordering::SeqCst), 0);
}

#[test]
fn changing_app_credentials_needs_a_reset() {
    let script = Script::new();
    let mut s = session(&script);
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();

    let err = s.submit_credentials(2002, "def456", "+12224448888").unwrap_err();
    assert!(matches!(err, AuthError::WrongPhase { phase: AuthPhase::CodeRequested, .. }));
    assert_eq!(s.phase(), AuthPhase::CodeRequested);
    assert!(s.client().is_some());
    assert_eq!(script.connects.load(Ordering::SeqCst), 1);
    assert_eq!(script.drops.load(Ordering::SeqCst), 0);
    assert_eq!(script.logouts.load(Ordering::SeqCst), 0);

    // Reset is what releases the handle, after logging out.
    s.reset_session();
    assert_eq!(script.logouts.load(Ordering::SeqCst), 1);
    assert_eq!(script.drops.load(Ordering::SeqCst), 1);

    s.submit_credentials(2002, "def456", "+12224448888").unwrap();
    assert_eq!(script.connects.load(Ordering::SeqCst), 2);
    assert_eq!(s.phase(), AuthPhase::CodeRequested);
}

#[test]
fn handle_survives_the_whole_login() {
    let script = Script::new();
    *script.password.lock().unwrap() = Some("s3cret".into());
    let mut s = session(&script);
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();
    s.submit_code("11111").unwrap_err();
    s.submit_code("24680").unwrap();
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();
    s.submit_code("24680").unwrap();
    s.submit_password("s3cret").unwrap();
    s.fetch_users(&[], &mut ()).unwrap();

    assert_eq!(script.connects.load(Ordering::SeqCst), 1);
    assert_eq!(script.drops.load(Ordering::SeqCst), 0);
}

#[test]
fn failed_resubmission_keeps_the_existing_handle() {
    let script = Script::new();
    let mut s = session(&script);
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();

    script.invalid_phone.store(true, Ordering::SeqCst);
    assert!(s.submit_credentials(1001, "abc123", "+12224448888").is_err());
    assert_eq!(s.phase(), AuthPhase::CodeRequested);
    assert!(s.client().is_some());
}

#[test]
fn correct_code_authenticates() {
    let script = Script::new();
    let mut s = session(&script);
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();

    assert_eq!(s.submit_code(" 24680 ").unwrap(), AuthPhase::Authenticated);
    assert!(s.is_authenticated());
}

#[test]
fn wrong_code_is_a_challenge_error() {
    let script = Script::new();
    let mut s = session(&script);
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();

    for bad in ["11111", "expired", "   "] {
        let err = s.submit_code(bad).unwrap_err();
        assert!(matches!(err, AuthError::Challenge(_)), "{bad:?} gave {err:?}");
        assert_eq!(s.phase(), AuthPhase::CodeRequested);
    }
    assert_eq!(s.submit_code("24680").unwrap(), AuthPhase::Authenticated);
}

#[test]
fn password_branch() {
    let script = Script::new();
    *script.password.lock().unwrap() = Some("s3cret".into());
    let mut s = session(&script);
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();

    assert_eq!(s.submit_code("24680").unwrap(), AuthPhase::TwoFactorRequired);
    assert_eq!(s.password_hint(), Some("pet"));

    let err = s.submit_password("guess").unwrap_err();
    assert!(matches!(err, AuthError::Challenge(_)));
    assert_eq!(err.to_string(), "Incorrect password. Please try again.");
    assert_eq!(s.phase(), AuthPhase::TwoFactorRequired);

    assert_eq!(s.submit_password("s3cret").unwrap(), AuthPhase::Authenticated);
    assert_eq!(s.password_hint(), None);
}

#[test]
fn operations_out_of_phase_are_refused() {
    let script = Script::new();
    let mut s = session(&script);

    assert!(matches!(s.submit_code("24680"), Err(AuthError::WrongPhase { .. })));
    assert!(matches!(s.submit_password("x"), Err(AuthError::WrongPhase { .. })));
    assert!(matches!(s.fetch_users(&[], &mut ()), Err(AuthError::WrongPhase { .. })));

    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();
    assert!(matches!(s.submit_password("x"), Err(AuthError::WrongPhase { .. })));

    s.submit_code("24680").unwrap();
    let err = s.submit_credentials(1001, "abc123", "+12224448888").unwrap_err();
    assert!(matches!(err, AuthError::WrongPhase { phase: AuthPhase::Authenticated, .. }));
}

#[test]
fn reset_clears_everything() {
    let script = Script::new();
    let backend = Arc::new(InMemoryBackend::new());
    backend.store(vec![0xAA]);
    let mut s = SessionContext::<ScriptedClient>::new(config(backend.clone()), script.clone()).unwrap();
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();
    s.submit_code("24680").unwrap();
    s.request_cancel();

    s.reset_session();

    assert_eq!(s.phase(), AuthPhase::Unauthenticated);
    assert!(s.client().is_none());
    assert!(s.credentials().is_none());
    assert!(!s.cancel_requested());
    assert_eq!(s.bridge().turns(), 0, "reset must hand out a fresh event loop");
    assert_eq!(script.logouts.load(Ordering::SeqCst), 1);
    assert!(!backend.exists());
    assert_eq!(backend.delete_count(), 1);
}

#[test]
fn reset_survives_a_failing_logout() {
    let script = Script::new();
    script.fail_logout.store(true, Ordering::SeqCst);
    let backend = Arc::new(InMemoryBackend::new());
    let mut s = SessionContext::<ScriptedClient>::new(config(backend.clone()), script.clone()).unwrap();
    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();

    s.reset_session();

    assert_eq!(s.phase(), AuthPhase::Unauthenticated);
    assert!(s.client().is_none());
    assert_eq!(script.logouts.load(Ordering::SeqCst), 1);
    assert_eq!(backend.delete_count(), 1);
}

#[test]
fn reset_without_a_client_still_wipes_artifacts() {
    let script = Script::new();
    let backend = Arc::new(InMemoryBackend::new());
    let mut s = SessionContext::<ScriptedClient>::new(config(backend.clone()), script.clone()).unwrap();

    s.reset_session();

    assert_eq!(script.logouts.load(Ordering::SeqCst), 0);
    assert_eq!(backend.delete_count(), 1);
    assert_eq!(s.phase(), AuthPhase::Unauthenticated);
}

#[test]
fn login_works_again_after_reset() {
    let script = Script::new();
    let mut s = authenticated(&script);
    s.reset_session();
    assert!(!script.authorized.load(Ordering::SeqCst));

    s.submit_credentials(1001, "abc123", "+12224448888").unwrap();
    assert_eq!(s.phase(), AuthPhase::CodeRequested);
    s.submit_code("24680").unwrap();
    assert!(s.is_authenticated());
}
