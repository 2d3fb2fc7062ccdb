//! Synchronous host turn → asynchronous remote call.
//!
//! The host re-runs its control flow on every interaction and cannot await.
//! [`EventLoopBridge`] owns one single-threaded tokio runtime for the whole
//! session and blocks the current turn on exactly one future at a time.
//! The reactor (epoll, kqueue or IOCP) is whatever tokio builds for the
//! target; there is nothing to select at run time.

use std::future::Future;
use std::io;

use tokio::runtime::{Builder, Runtime};

// ─── EventLoopBridge ──────────────────────────────────────────────────────────

/// One execution context per session, re-entered on every host turn.
pub struct EventLoopBridge {
    runtime: Runtime,
    turns:   u64,
}

impl EventLoopBridge {
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name("tgforge-session")
            .build()?;
        tracing::debug!("[tgforge] Event loop created");
        Ok(Self { runtime, turns: 0 })
    }

    /// Block the calling turn until `fut` completes.
    ///
    /// Taking `&mut self` is what keeps a second operation from being
    /// scheduled while one is still pending.
    pub fn run<F: Future>(&mut self, fut: F) -> F::Output {
        let _ctx = self.runtime.enter();
        self.turns += 1;
        tracing::trace!("[tgforge] turn {} →", self.turns);
        self.runtime.block_on(fut)
    }

    /// Like [`run`](Self::run), but give up as soon as `interrupt` resolves.
    ///
    /// Returns `None` when interrupted; `fut` is dropped unfinished. Both
    /// futures live only for this turn.
    pub fn run_or_interrupt<F, I>(&mut self, fut: F, interrupt: I) -> Option<F::Output>
    where
        F: Future,
        I: Future<Output = ()>,
    {
        self.run(async move {
            tokio::select! {
                biased;
                _ = interrupt => None,
                out = fut     => Some(out),
            }
        })
    }

    /// Number of turns this context has served.
    pub fn turns(&self) -> u64 { self.turns }
}

/// Resolves when the process receives Ctrl+C.
///
/// Only listens while it is being polled, i.e. during the turn it was passed
/// to. Never resolves if the signal handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("[tgforge] Could not listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

impl std::fmt::Debug for EventLoopBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoopBridge")
            .field("turns", &self.turns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_survives_across_turns() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let mut bridge = EventLoopBridge::new().unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        let flag2 = flag.clone();

        // Spawned in turn 1, only driven once turn 2 yields.
        bridge.run(async move {
            tokio::spawn(async move { flag2.store(true, Ordering::SeqCst) });
        });
        let seen = bridge.run(async {
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            flag.load(Ordering::SeqCst)
        });
        assert!(seen, "task spawned in an earlier turn must still be alive");
        assert_eq!(bridge.turns(), 2);
    }

    #[test]
    fn timers_work_inside_a_turn() {
        let mut bridge = EventLoopBridge::new().unwrap();
        let out = bridge.run(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            7
        });
        assert_eq!(out, 7);
    }

    #[test]
    fn interrupt_abandons_the_turn() {
        let mut bridge = EventLoopBridge::new().unwrap();
        let out = bridge.run_or_interrupt(std::future::pending::<u8>(), async {});
        assert_eq!(out, None);

        let out = bridge.run_or_interrupt(async { 3 }, std::future::pending());
        assert_eq!(out, Some(3));
        assert_eq!(bridge.turns(), 2);
    }
}
