//! tgforge — interactive login + batch user lookup.
//!
//! Every prompt is one host turn: the session context survives between
//! turns and each network step is run to completion before the next prompt.
//!
//! Configure through the environment (anything unset is prompted for):
//!   TGFORGE_API_ID, TGFORGE_API_HASH, TGFORGE_PHONE
//!   TGFORGE_FORCE_SMS=1        request the code by SMS
//!   TGFORGE_REPLAY=path.json   fixture the replay client serves
//!   TGFORGE_EXPORT=out.csv     export path (.csv or .json)
//!   TGFORGE_SESSION_DIR=dir    where the session file lives
//!
//!   RUST_LOG=tgforge_client=debug cargo run -p tgforge-app

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tgforge_client::bridge::ctrl_c;
use tgforge_client::export::{export_file_name, export_to_path, ExportFormat};
use tgforge_client::fetch::parse_id_list;
use tgforge_client::replay::{ReplayClient, ReplayScript};
use tgforge_client::session::parse_api_id;
use tgforge_client::{
    AuthError, AuthPhase, Config, CredentialsOutcome, ErrorRecord, FetchObserver, SessionContext,
    UserRecord,
};

fn main() {
    // Enable logging: RUST_LOG=tgforge_client=info,tgforge_app=info
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: single-threaded at this point, no other threads reading env
        unsafe { std::env::set_var("RUST_LOG", "tgforge_client=info,tgforge_app=info"); }
    }
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("\n✗ {e}");
        std::process::exit(1);
    }
}

// ─── Settings ─────────────────────────────────────────────────────────────────

struct Settings {
    api_id:      Option<String>,
    api_hash:    Option<String>,
    phone:       Option<String>,
    force_sms:   bool,
    replay:      Option<PathBuf>,
    export:      Option<PathBuf>,
    session_dir: PathBuf,
}

impl Settings {
    fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_id:      var("TGFORGE_API_ID"),
            api_hash:    var("TGFORGE_API_HASH"),
            phone:       var("TGFORGE_PHONE"),
            force_sms:   var("TGFORGE_FORCE_SMS").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            replay:      var("TGFORGE_REPLAY").map(PathBuf::from),
            export:      var("TGFORGE_EXPORT").map(PathBuf::from),
            session_dir: var("TGFORGE_SESSION_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

// ─── Main loop ────────────────────────────────────────────────────────────────

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();

    let Some(replay) = settings.replay.clone() else {
        eprintln!("Set TGFORGE_REPLAY to a replay fixture (see tgforge_client::replay).");
        std::process::exit(1);
    };
    let script = Arc::new(ReplayScript::load(&replay)?);
    println!("📼 Replaying {} ({} users)", replay.display(), script.users.len());

    let mut config = Config::in_dir(&settings.session_dir, "tgforge");
    config.force_sms = settings.force_sms;
    let mut session = SessionContext::<ReplayClient>::new(config, script)?;

    println!("TGForge\n");
    loop {
        let turn = match session.phase() {
            AuthPhase::Unauthenticated   => credentials_turn(&mut session, &settings),
            AuthPhase::CodeRequested     => code_turn(&mut session),
            AuthPhase::TwoFactorRequired => password_turn(&mut session),
            AuthPhase::Authenticated     => fetch_turn(&mut session, &settings),
        };
        match turn {
            Ok(true)  => {}
            Ok(false) => break,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e)    => return Err(e.into()),
        }
    }
    println!("👋 Bye");
    Ok(())
}

type Session = SessionContext<ReplayClient>;

fn credentials_turn(session: &mut Session, settings: &Settings) -> io::Result<bool> {
    println!("── Enter Telegram API Credentials ──");
    let api_id   = settings.api_id.clone().map_or_else(|| prompt(session, "API ID: "), Ok)?;
    let api_hash = settings.api_hash.clone().map_or_else(|| prompt(session, "API Hash: "), Ok)?;
    let phone    = settings.phone.clone().map_or_else(|| prompt(session, "Phone Number (e.g., +1 2224448888): "), Ok)?;
    if api_id.is_empty() && api_hash.is_empty() && phone.is_empty() {
        return Ok(false);
    }

    let api_id = match parse_api_id(&api_id) {
        Ok(id) => id,
        Err(e) => {
            println!("✗ {e}");
            return Ok(settings.api_id.is_none());
        }
    };

    println!("🔌 Connecting with Telegram's API…");
    match session.submit_credentials(api_id, &api_hash, &phone) {
        Ok(CredentialsOutcome::AlreadyAuthorized) => println!("✅ Already logged in"),
        Ok(CredentialsOutcome::CodeSent(info)) => {
            print!("📱 Code sent ({})", info.code_type);
            if let Some(next) = &info.next_type {
                print!(", next: {next}");
            }
            if let Some(t) = info.timeout_seconds {
                print!(", resend after {t}s");
            }
            println!();
        }
        Err(e) => {
            println!("✗ {e}");
            // Env-provided credentials would fail the same way forever.
            return Ok(settings.phone.is_none());
        }
    }
    Ok(true)
}

fn code_turn(session: &mut Session) -> io::Result<bool> {
    let code = prompt(session, "Enter the code you received (or 'reset'): ")?;
    if code.eq_ignore_ascii_case("reset") {
        session.reset_session();
        return Ok(true);
    }
    match session.submit_code(&code) {
        Ok(AuthPhase::Authenticated) => println!("✅ Signed in"),
        Ok(_)                        => {}
        Err(e)                       => report_auth_error(&e),
    }
    Ok(true)
}

fn password_turn(session: &mut Session) -> io::Result<bool> {
    let hint = session.password_hint().unwrap_or("(no hint)").to_string();
    let pw = prompt(session, &format!("2FA password (hint: {hint}): "))?;
    match session.submit_password(&pw) {
        Ok(_)  => println!("✅ 2FA complete"),
        Err(e) => report_auth_error(&e),
    }
    Ok(true)
}

fn fetch_turn(session: &mut Session, settings: &Settings) -> io::Result<bool> {
    let input = prompt(session, "User IDs (comma or newline separated), 'reset' or 'quit': ")?;
    match input.trim() {
        "" | "quit" | "exit" => return Ok(false),
        "reset" => {
            session.reset_session();
            println!("🔄 Session reset");
            return Ok(true);
        }
        _ => {}
    }

    let ids = parse_id_list(&input);
    session.clear_cancel();
    println!("🔎 Fetching {} users (Ctrl+C to cancel)…", ids.len());

    let mut progress = Progress { total: ids.len() };
    let outcome = match session.fetch_users_until(&ids, &mut progress, ctrl_c()) {
        Ok(o)  => o,
        Err(e) => {
            report_auth_error(&e);
            return Ok(true);
        }
    };
    println!(
        "Done: {} users, {} errors{}",
        outcome.users().count(),
        outcome.errors().count(),
        if outcome.cancelled { " (cancelled)" } else { "" },
    );
    if outcome.is_empty() {
        return Ok(true);
    }

    let path = settings.export.clone().unwrap_or_else(|| {
        let label = format!("tgforge-{}", Local::now().format("%Y%m%d-%H%M%S"));
        PathBuf::from(export_file_name(&label, ExportFormat::Csv))
    });
    match export_to_path(&outcome, &path) {
        Ok(fmt) => println!("💾 Saved {} ({})", path.display(), fmt.extension()),
        Err(e)  => println!("✗ Export failed: {e}"),
    }
    Ok(true)
}

// ─── Progress ─────────────────────────────────────────────────────────────────

struct Progress {
    total: usize,
}

impl FetchObserver for Progress {
    fn on_record(&mut self, index: usize, record: &UserRecord) {
        println!("[{}/{}] ✅ {} {}", index + 1, self.total, record.user_id, record.username);
    }

    fn on_error(&mut self, index: usize, error: &ErrorRecord) {
        println!("[{}/{}] ⚠ Error fetching user ID {}: {}", index + 1, self.total, error.user_id, error.error);
    }

    fn on_cancelled(&mut self, attempted: usize) {
        println!("⏹ Fetch cancelled by user after {attempted} of {}.", self.total);
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn report_auth_error(e: &AuthError) {
    match e {
        AuthError::WrongPhase { .. } => println!("✗ {e} (type 'reset' to start over)"),
        _                            => println!("✗ {e}"),
    }
}

/// Read one line. Ctrl+C while waiting ends the process, as it would
/// without the session's signal listener.
fn prompt(session: &mut Session, msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let read = async {
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).map(|n| (n, line))
        })
        .await
    };
    match session.bridge_mut().run_or_interrupt(read, ctrl_c()) {
        None => {
            println!("\n👋 Interrupted");
            std::process::exit(130);
        }
        Some(Err(e))             => Err(io::Error::other(e)),
        Some(Ok(Err(e)))         => Err(e),
        Some(Ok(Ok((0, _))))     => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed")),
        Some(Ok(Ok((_, line)))) => Ok(line.trim().to_string()),
    }
}
