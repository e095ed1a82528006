//! The filtered, sorted view of the local store that the UI renders.

mod event;

pub use self::event::{ErrorPresenter, LogPresenter, MediaEvent};
use crate::error::{ErrorKind, Result};
use crate::scope::{FeedScope, FilterState};
use crate::sync::{FeedSyncEngine, SyncOutcome};
use exn::ResultExt;
use mosaic_store::{Item, Sort, StoreHandle};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};
use tracing::instrument;

/// Owns the published item list and keeps it current.
///
/// The list and the active filter are published on [`watch`] channels. Every
/// change (a filter toggle, a sync that touched the store, a media event)
/// re-reads the store and republishes the whole list.
pub struct FeedController {
    store: StoreHandle,
    sync: Arc<FeedSyncEngine>,
    presenter: Arc<dyn ErrorPresenter>,
    items: watch::Sender<Arc<Vec<Item>>>,
    filter: watch::Sender<FilterState>,
    needs_loading_more_items: AtomicBool,
}

impl FeedController {
    pub fn new(store: StoreHandle, sync: Arc<FeedSyncEngine>) -> Self {
        Self {
            store,
            sync,
            presenter: Arc::new(LogPresenter),
            items: watch::Sender::new(Arc::default()),
            filter: watch::Sender::new(FilterState::default()),
            // Nothing older has been fetched yet.
            needs_loading_more_items: AtomicBool::new(true),
        }
    }

    pub fn with_presenter(mut self, presenter: impl ErrorPresenter + 'static) -> Self {
        self.presenter = Arc::new(presenter);
        self
    }

    pub fn scope(&self) -> &FeedScope {
        self.sync.scope()
    }

    pub fn items(&self) -> watch::Receiver<Arc<Vec<Item>>> {
        self.items.subscribe()
    }

    pub fn filter(&self) -> watch::Receiver<FilterState> {
        self.filter.subscribe()
    }

    /// The UI scrolled close to the end of the list.
    pub fn request_more_items(&self) {
        self.needs_loading_more_items.store(true, Ordering::SeqCst);
    }

    pub fn needs_loading_more_items(&self) -> bool {
        self.needs_loading_more_items.load(Ordering::SeqCst)
    }

    /// Re-reads the store under the scope and the active filter, newest
    /// first, and publishes the result.
    #[instrument(skip_all)]
    pub async fn load_data(&self) -> Result<()> {
        let filter = *self.filter.borrow();
        let predicate = self.scope().predicate(filter);
        let items = self.store.query(&predicate, Sort::newest(self.scope().sort)).await.or_raise(|| ErrorKind::Store)?;
        tracing::debug!(items = items.len(), ?filter, "Publishing feed");
        self.items.send_replace(Arc::new(items));
        Ok(())
    }

    /// Pages further back in time.
    pub async fn load_more_items(&self) -> Result<SyncOutcome> {
        self.needs_loading_more_items.store(false, Ordering::SeqCst);
        let outcome = self.sync.search_old_media().await;
        self.reload_if(outcome).await
    }

    pub async fn on_pull_to_refresh(&self) -> Result<SyncOutcome> {
        let filter = *self.filter.borrow();
        let outcome = self.sync.search_new_media(filter).await;
        self.reload_if(outcome).await
    }

    pub async fn on_filter_changed(&self, filter: FilterState) -> Result<()> {
        self.filter.send_replace(filter);
        self.load_data().await
    }

    async fn reload_if(&self, outcome: SyncOutcome) -> Result<SyncOutcome> {
        if outcome.needs_reload() {
            self.load_data().await?;
        }
        Ok(outcome)
    }

    /// Reacts to one media event. Returns `true` if the feed was reloaded.
    pub async fn handle_event(&self, event: &MediaEvent) -> Result<bool> {
        let reload = match event {
            MediaEvent::Deleted { result } | MediaEvent::Moved { result } | MediaEvent::Copied { result } => {
                if let Err(error) = result {
                    self.presenter.present(error);
                }
                true
            },
            MediaEvent::Renamed { account } => *account == self.scope().account,
            MediaEvent::Uploaded { result, account } => result.is_ok() && *account == self.scope().account,
        };
        if reload {
            self.load_data().await?;
        }
        Ok(reload)
    }

    /// Handles events until the channel closes. Drop the sender side (or the
    /// task running this) to unsubscribe.
    pub async fn run(&self, mut events: broadcast::Receiver<MediaEvent>) {
        loop {
            let result = match events.recv().await {
                Ok(event) => self.handle_event(&event).await.map(|_| ()),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "Missed media events; reloading");
                    self.load_data().await
                },
                Err(broadcast::error::RecvError::Closed) => return,
            };
            if let Err(err) = result {
                tracing::warn!(error = ?err, "Could not refresh feed after media event");
            }
        }
    }
}
