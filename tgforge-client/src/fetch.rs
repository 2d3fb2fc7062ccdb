//! Sequential batch lookup of user ids.
//!
//! One task walks the identifiers in order. Before each one it polls the
//! session's cancellation token; a bad id or a failed lookup becomes an
//! [`ErrorRecord`] in place and the batch moves on. Nothing is retried and
//! nothing runs in parallel: rate limiting belongs to the remote client.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::{AuthError, FetchError};
use crate::normalize::{normalize_user, UserRecord};
use crate::remote::{RawEntity, RemoteClient};
use crate::session::{AuthPhase, SessionContext};

// ─── RawId ────────────────────────────────────────────────────────────────────

/// An identifier as the operator supplied it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    /// `" 42 "` → `42`. Textual ids are trimmed before parsing.
    pub fn coerce(&self) -> Result<i64, FetchError> {
        match self {
            Self::Int(id) => Ok(*id),
            Self::Text(s) => s.trim().parse::<i64>().map_err(|e| FetchError::InvalidId {
                raw:    self.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RawId {
    fn from(id: i64) -> Self { Self::Int(id) }
}

impl From<&str> for RawId {
    fn from(s: &str) -> Self { Self::Text(s.to_string()) }
}

impl From<String> for RawId {
    fn from(s: String) -> Self { Self::Text(s) }
}

/// Split pasted input on commas and newlines. Blank entries are skipped;
/// surrounding whitespace is kept for [`RawId::coerce`] to deal with.
pub fn parse_id_list(input: &str) -> Vec<RawId> {
    input
        .split([',', '\n', ';'])
        .filter(|tok| !tok.trim().is_empty())
        .map(RawId::from)
        .collect()
}

// ─── Outcome ──────────────────────────────────────────────────────────────────

/// A failed identifier, kept in its original position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// The identifier exactly as supplied.
    pub user_id: RawId,
    pub error:   String,
}

/// One attempted identifier.
#[derive(Clone, Debug, PartialEq)]
pub enum Row {
    User(UserRecord),
    Error(ErrorRecord),
}

impl Row {
    pub fn as_user(&self) -> Option<&UserRecord> {
        match self { Self::User(u) => Some(u), Self::Error(_) => None }
    }

    pub fn as_error(&self) -> Option<&ErrorRecord> {
        match self { Self::Error(e) => Some(e), Self::User(_) => None }
    }
}

/// Rows in input order, one per attempted identifier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchOutcome {
    pub rows:      Vec<Row>,
    /// Set when the batch stopped early on a cancellation request.
    pub cancelled: bool,
}

impl FetchOutcome {
    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn users(&self) -> impl Iterator<Item = &UserRecord> {
        self.rows.iter().filter_map(Row::as_user)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.rows.iter().filter_map(Row::as_error)
    }

    pub fn has_errors(&self) -> bool { self.errors().next().is_some() }
}

// ─── FetchObserver ────────────────────────────────────────────────────────────

/// Progress hooks for the interactive surface. All methods default to no-ops.
pub trait FetchObserver {
    fn on_start(&mut self, _total: usize) {}
    fn on_record(&mut self, _index: usize, _record: &UserRecord) {}
    fn on_error(&mut self, _index: usize, _error: &ErrorRecord) {}
    fn on_cancelled(&mut self, _attempted: usize) {}
}

impl FetchObserver for () {}

// ─── BatchFetcher ─────────────────────────────────────────────────────────────

/// Drives one batch against an authenticated client.
pub struct BatchFetcher<'a, C> {
    client: &'a C,
    cancel: &'a CancellationToken,
}

impl<'a, C: RemoteClient> BatchFetcher<'a, C> {
    pub fn new(client: &'a C, cancel: &'a CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Look up a single identifier.
    pub async fn fetch_one(&self, raw: &RawId) -> Result<UserRecord, FetchError> {
        let id = raw.coerce()?;
        let entity = self.client
            .get_entity(id)
            .await
            .map_err(|source| FetchError::Lookup { id, source })?;
        match entity {
            RawEntity::User(user) => Ok(normalize_user(&user)),
            other => Err(FetchError::NotAUser { id, kind: other.kind() }),
        }
    }

    /// Walk `ids` in order until done or cancelled.
    pub async fn run(&self, ids: &[RawId], observer: &mut dyn FetchObserver) -> FetchOutcome {
        let mut outcome = FetchOutcome { rows: Vec::with_capacity(ids.len()), cancelled: false };
        observer.on_start(ids.len());

        for (index, raw) in ids.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("[tgforge] Fetch cancelled after {index} of {} ids", ids.len());
                outcome.cancelled = true;
                observer.on_cancelled(index);
                break;
            }

            match self.fetch_one(raw).await {
                Ok(record) => {
                    observer.on_record(index, &record);
                    outcome.rows.push(Row::User(record));
                }
                Err(e) => {
                    match &e {
                        FetchError::InvalidId { .. } =>
                            tracing::warn!("[tgforge] Invalid user ID format: {raw:?}"),
                        _ => tracing::warn!("[tgforge] Error fetching user ID {raw}: {e}"),
                    }
                    let record = ErrorRecord { user_id: raw.clone(), error: e.to_string() };
                    observer.on_error(index, &record);
                    outcome.rows.push(Row::Error(record));
                }
            }
        }

        tracing::info!(
            "[tgforge] Fetched {} users, {} errors",
            outcome.users().count(),
            outcome.errors().count(),
        );
        outcome
    }
}

// ─── SessionContext entry point ───────────────────────────────────────────────

impl<C: RemoteClient> SessionContext<C> {
    /// Fetch `ids` with the session's client, blocking this turn until the
    /// batch finishes or observes a cancellation request.
    pub fn fetch_users(
        &mut self,
        ids:      &[RawId],
        observer: &mut dyn FetchObserver,
    ) -> Result<FetchOutcome, AuthError> {
        self.fetch_users_until(ids, observer, std::future::pending())
    }

    /// [`fetch_users`](Self::fetch_users), cancelling the batch when
    /// `interrupt` resolves (e.g. [`crate::bridge::ctrl_c`]).
    ///
    /// The lookup in flight at that moment still completes; the batch stops
    /// at the next identifier. `interrupt` is dropped when the turn ends, so
    /// it never reaches a later batch.
    pub fn fetch_users_until<I>(
        &mut self,
        ids:       &[RawId],
        observer:  &mut dyn FetchObserver,
        interrupt: I,
    ) -> Result<FetchOutcome, AuthError>
    where
        I: Future<Output = ()>,
    {
        let client = match (&self.phase(), self.client.as_ref()) {
            (AuthPhase::Authenticated, Some(client)) => client,
            _ => return Err(AuthError::WrongPhase { operation: "fetch_users", phase: self.phase() }),
        };
        let cancel  = &self.cancel;
        let fetcher = BatchFetcher::new(client, cancel);
        let outcome = self.bridge.run(async move {
            let mut batch = std::pin::pin!(fetcher.run(ids, observer));
            tokio::select! {
                biased;
                _ = interrupt => {
                    tracing::info!("[tgforge] Interrupt received, cancelling fetch");
                    cancel.cancel();
                    batch.await
                }
                outcome = &mut batch => outcome,
            }
        });
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_trims_whitespace() {
        assert_eq!(RawId::from(" 42 ").coerce().unwrap(), 42);
        assert_eq!(RawId::from("\t-100123\n").coerce().unwrap(), -100123);
        assert_eq!(RawId::Int(5).coerce().unwrap(), 5);
    }

    #[test]
    fn coercion_failure_keeps_original_value() {
        match RawId::from("abc").coerce() {
            Err(FetchError::InvalidId { raw, .. }) => assert_eq!(raw, RawId::Text("abc".into())),
            other => panic!("expected InvalidId, got {other:?}"),
        }
    }

    #[test]
    fn id_list_splitting() {
        let ids = parse_id_list("1, 2\n\n abc ;3,");
        assert_eq!(ids, vec![
            RawId::from("1"),
            RawId::from(" 2"),
            RawId::from(" abc "),
            RawId::from("3"),
        ]);
    }

    #[test]
    fn raw_ids_deserialize_from_mixed_json() {
        let ids: Vec<RawId> = serde_json::from_str(r#"[1, " 2 ", "x"]"#).unwrap();
        assert_eq!(ids, vec![RawId::Int(1), RawId::from(" 2 "), RawId::from("x")]);
    }
}
