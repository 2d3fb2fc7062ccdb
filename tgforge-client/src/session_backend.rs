//! Pluggable session artifact storage.
//!
//! The underlying client persists its auth key wherever it likes; the core
//! only ever needs to wipe those artifacts on reset. [`SessionBackend`]
//! abstracts over where they live so tests and replay runs can swap in
//! [`InMemoryBackend`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// ─── Trait ────────────────────────────────────────────────────────────────────

/// An abstraction over where session artifacts are kept.
pub trait SessionBackend: Send + Sync {
    /// Remove every stored artifact. Missing artifacts are not an error.
    fn delete(&self) -> io::Result<()>;

    /// Whether anything is currently stored.
    fn exists(&self) -> bool;

    /// Human-readable name of this backend (for log messages).
    fn name(&self) -> &str;
}

// ─── FileBackend ──────────────────────────────────────────────────────────────

/// The default backend — a `<name>.session` file plus its journal sidecar.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Session file `<dir>/<name>.session`.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self { path: dir.as_ref().join(format!("{name}.session")) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn journal_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push("-journal");
        PathBuf::from(p)
    }
}

impl SessionBackend for FileBackend {
    fn delete(&self) -> io::Result<()> {
        for path in [self.path.clone(), self.journal_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("[tgforge] Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn exists(&self) -> bool { self.path.exists() }

    fn name(&self) -> &str { "file" }
}

// ─── InMemoryBackend ─────────────────────────────────────────────────────────

/// An ephemeral backend that keeps an opaque blob in memory.
///
/// Useful for testing or for replay runs that should always start fresh.
#[derive(Default)]
pub struct InMemoryBackend {
    data:    Mutex<Option<Vec<u8>>>,
    deletes: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self { Self::default() }

    /// Pretend the client wrote something.
    pub fn store(&self, blob: Vec<u8>) {
        if let Ok(mut lock) = self.data.lock() {
            *lock = Some(blob);
        }
    }

    /// How many times [`SessionBackend::delete`] has been called.
    pub fn delete_count(&self) -> usize { self.deletes.load(Ordering::SeqCst) }
}

impl SessionBackend for InMemoryBackend {
    fn delete(&self) -> io::Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut lock = self.data.lock()
            .map_err(|_| io::Error::other("session store lock poisoned"))?;
        *lock = None;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.data.lock().map(|d| d.is_some()).unwrap_or(false)
    }

    fn name(&self) -> &str { "in-memory" }
}
