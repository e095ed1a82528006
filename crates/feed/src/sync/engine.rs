use super::error::{ErrorKind, Result};
use super::window::{SyncWindow, WindowStep};
use crate::remote::{RemoteError, TransportHandle};
use crate::scope::{FeedScope, FilterState};
use exn::ResultExt;
use mosaic_store::{RemoteFile, Sort, SortField, StoreHandle};
use std::collections::HashSet;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::instrument;

/// What a synchronization pass did to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Items were added, changed or removed.
    Updated,
    Unchanged,
    /// Backward pagination ran out of rungs. `reload` is set when the last
    /// rung still returned records.
    Exhausted { reload: bool },
    /// A search or store operation failed; the details were logged.
    Failed,
}
impl SyncOutcome {
    /// Whether the feed should re-read the store.
    pub fn needs_reload(self) -> bool {
        matches!(self, Self::Updated | Self::Exhausted { reload: true })
    }
}

/// Keeps the local store in step with the server.
///
/// Two procedures share the engine:
/// - a **forward poll** over the last 30 days, for new and changed media;
/// - **backward pagination** from the oldest item held locally, widening the
///   window rung by rung (see [`WindowStep`]) until a search changes
///   something or the ladder runs out.
///
/// Every search is bounded by a timeout. Responses for a different account
/// are ignored.
pub struct FeedSyncEngine {
    store: StoreHandle,
    transport: TransportHandle,
    scope: FeedScope,
    timeout: Duration,
    backward: Mutex<()>,
}

impl FeedSyncEngine {
    pub fn new(store: StoreHandle, transport: TransportHandle, scope: FeedScope, timeout: Duration) -> Self {
        Self { store, transport, scope, timeout, backward: Mutex::new(()) }
    }

    pub fn scope(&self) -> &FeedScope {
        &self.scope
    }

    /// Looks for new and changed media in the recent past.
    ///
    /// When the server has nothing recent and the store holds nothing for
    /// the active filter, falls back to one pass of backward pagination so
    /// a fresh install still fills up.
    #[instrument(skip_all, fields(account = %self.scope.account))]
    pub async fn search_new_media(&self, filter: FilterState) -> SyncOutcome {
        let predicate = self.scope.predicate(filter);
        let window = match SyncWindow::forward(OffsetDateTime::now_utc(), predicate.clone()) {
            Ok(window) => window,
            Err(err) => {
                tracing::warn!(error = ?err, "Could not build forward window");
                return SyncOutcome::Failed;
            },
        };
        let files = match self.search(&window).await {
            Ok(Some(files)) => files,
            Ok(None) => return SyncOutcome::Unchanged,
            Err(err) => {
                tracing::warn!(error = ?err, retryable = err.is_retryable(), "Forward poll failed");
                return SyncOutcome::Failed;
            },
        };
        if files.is_empty() {
            return match self.store.first(&predicate, Sort::newest(self.scope.sort)).await {
                Ok(None) => {
                    tracing::debug!("Nothing recent and nothing local; paging backward");
                    self.search_old_media().await
                },
                Ok(Some(_)) => SyncOutcome::Unchanged,
                Err(err) => {
                    tracing::warn!(error = ?err, "Could not query local items");
                    SyncOutcome::Failed
                },
            };
        }
        match self.reconcile(&window, &files).await {
            Ok(true) => SyncOutcome::Updated,
            Ok(false) => SyncOutcome::Unchanged,
            Err(err) => {
                tracing::warn!(error = ?err, "Could not reconcile forward poll");
                SyncOutcome::Failed
            },
        }
    }

    /// Pages backward from the oldest local item, one rung at a time, until
    /// a search changes the store or the ladder is exhausted.
    ///
    /// Only one backward pass runs at a time; a call made while another is in
    /// progress returns [`SyncOutcome::Unchanged`] straight away.
    #[instrument(skip_all, fields(account = %self.scope.account))]
    pub async fn search_old_media(&self) -> SyncOutcome {
        let Ok(_guard) = self.backward.try_lock() else {
            tracing::debug!("Backward pagination already running");
            return SyncOutcome::Unchanged;
        };
        let predicate = self.scope.predicate(FilterState::default());
        let mut last_had_records = false;
        for step in WindowStep::ladder() {
            let less = match self.store.first(&predicate, Sort::oldest(SortField::Date)).await {
                Ok(Some(oldest)) => oldest.date,
                Ok(None) => OffsetDateTime::now_utc(),
                Err(err) => {
                    tracing::warn!(error = ?err, ?step, "Could not find the oldest local item");
                    return SyncOutcome::Failed;
                },
            };
            let window = match SyncWindow::backward(step, less, predicate.clone()) {
                Ok(window) => window,
                Err(err) => {
                    tracing::warn!(error = ?err, ?step, "Could not build backward window");
                    return SyncOutcome::Failed;
                },
            };
            let files = match self.search(&window).await {
                Ok(Some(files)) => files,
                Ok(None) => return SyncOutcome::Unchanged,
                Err(err) => {
                    tracing::warn!(error = ?err, ?step, retryable = err.is_retryable(), "Backward search failed");
                    return SyncOutcome::Failed;
                },
            };
            tracing::debug!(?step, records = files.len(), "Backward search returned");
            last_had_records = !files.is_empty();
            if files.is_empty() {
                continue;
            }
            match self.reconcile(&window, &files).await {
                Ok(true) => return SyncOutcome::Updated,
                Ok(false) => {},
                Err(err) => {
                    tracing::warn!(error = ?err, ?step, "Could not reconcile backward search");
                    return SyncOutcome::Failed;
                },
            }
        }
        tracing::info!(reload = last_had_records, "Backward pagination exhausted");
        SyncOutcome::Exhausted { reload: last_had_records }
    }

    /// Runs one search. `Ok(None)` means the server answered for another
    /// account.
    async fn search(&self, window: &SyncWindow) -> Result<Option<Vec<RemoteFile>>> {
        let query = window.query(self.scope.include_hidden);
        let response = tokio::time::timeout(self.timeout, self.transport.search_media(&query))
            .await
            .unwrap_or_else(|_elapsed| Err(exn::Exn::from(RemoteError::timeout())))
            .or_raise(|| ErrorKind::Remote)?;
        if response.account != self.scope.account {
            tracing::warn!(expected = %self.scope.account, received = %response.account, "Ignoring search response for another account");
            return Ok(None);
        }
        Ok(Some(response.files))
    }

    /// Converts and applies one response. Returns `true` if the store
    /// changed.
    ///
    /// Every returned record is stored, whatever the active filter. Only
    /// local items the filter shows, plus those the response mentions, are
    /// compared against it, so a filtered poll never deletes hidden kinds.
    async fn reconcile(&self, window: &SyncWindow, files: &[RemoteFile]) -> Result<bool> {
        let items = self.store.convert(files).await.or_raise(|| ErrorKind::Store)?;
        let window = window.covering(&items);
        let visible = window.local_predicate();
        let everything = visible.clone().with_kinds(FilterState::default().kinds());
        let incoming: Vec<_> = items.into_iter().filter(|item| everything.matches(item)).collect();
        let mentioned: HashSet<&str> = incoming.iter().map(|item| item.id.as_str()).collect();
        let existing: Vec<_> = self
            .store
            .query(&everything, Sort::newest(self.scope.sort))
            .await
            .or_raise(|| ErrorKind::Store)?
            .into_iter()
            .filter(|item| visible.matches(item) || mentioned.contains(item.id.as_str()))
            .collect();
        let diff = self.store.diff(incoming, existing).await.or_raise(|| ErrorKind::Store)?;
        tracing::debug!(updated = diff.updated.len(), deleted = diff.deleted.len(), "Reconciled search window");
        Ok(!diff.is_empty())
    }
}
