//
//  engine.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

use arc_swap::ArcSwapOption;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::mocks::MockRegistry;
use super::state::{BuildPhase, BuildState};
use crate::assets::LegacyAssetIndex;
use crate::config::GraphConfig;
use crate::crawler::{crawl, CrawlOptions};
use crate::error::{GraphError, InitError};
use crate::haste::{HasteMap, NameIndex};
use crate::metadata::ModuleCache;
use crate::snapshot::FileSnapshot;
use crate::watcher::{FileChange, FileWatcher};

/// Resolves once the initial crawl and index builds are done.
pub type InitFuture = Shared<BoxFuture<'static, Result<(), Arc<InitError>>>>;

/// Incremental module index and dependency resolver over a set of roots.
///
/// Cheap to clone; clones share the same index.
#[derive(Clone)]
pub struct DependencyGraph {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) config: GraphConfig,
    pub(crate) snapshot: Arc<FileSnapshot>,
    pub(crate) cache: Arc<ModuleCache>,
    pub(crate) name_index: Arc<dyn NameIndex>,
    pub(crate) assets: Option<Arc<LegacyAssetIndex>>,
    pub(crate) mocks: ArcSwapOption<MockRegistry>,
    pub(crate) init: Mutex<Option<InitFuture>>,
    pub(crate) state: watch::Sender<BuildState>,
    /// Changes accepted so far; requests wait until this many have settled.
    pub(crate) scheduled: AtomicU64,
    pub(crate) updates: mpsc::UnboundedSender<FileChange>,
    pub(crate) update_rx: Mutex<Option<mpsc::UnboundedReceiver<FileChange>>>,
    pub(crate) events: Mutex<Option<mpsc::UnboundedReceiver<FileChange>>>,
    pub(crate) cancel: CancellationToken,
}

impl DependencyGraph {
    pub fn new(config: GraphConfig, watcher: Arc<dyn FileWatcher>) -> Self {
        Self::with_name_index(config, watcher, |config, snapshot, cache| {
            Arc::new(HasteMap::new(config, snapshot, cache)) as Arc<dyn NameIndex>
        })
    }

    /// Build a graph around a custom [`NameIndex`].
    pub fn with_name_index<F>(config: GraphConfig, watcher: Arc<dyn FileWatcher>, make_index: F) -> Self
    where
        F: FnOnce(&GraphConfig, Arc<FileSnapshot>, Arc<ModuleCache>) -> Arc<dyn NameIndex>,
    {
        let snapshot = Arc::new(FileSnapshot::new(config.roots().to_vec(), config.ignore_fn()));
        let cache = Arc::new(ModuleCache::new(Arc::clone(config.cache()), config.asset_exts()));
        let name_index = make_index(&config, Arc::clone(&snapshot), Arc::clone(&cache));
        let assets = LegacyAssetIndex::from_config(&config).map(Arc::new);
        let (updates, update_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(BuildState::initial());

        Self {
            inner: Arc::new(Inner {
                snapshot,
                cache,
                name_index,
                assets,
                mocks: ArcSwapOption::empty(),
                init: Mutex::new(None),
                state,
                scheduled: AtomicU64::new(0),
                updates,
                update_rx: Mutex::new(Some(update_rx)),
                events: Mutex::new(Some(watcher.subscribe())),
                cancel: CancellationToken::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    /// Kick off the initial build. Idempotent: every call returns the same
    /// shared future. Must be called from within a tokio runtime.
    pub fn start(&self) -> InitFuture {
        let mut slot = self.inner.init.lock();
        if let Some(init) = slot.as_ref() {
            return init.clone();
        }

        let inner = Arc::clone(&self.inner);
        let init = async move { inner.initial_build().await }.boxed().shared();
        *slot = Some(init.clone());
        drop(slot);

        tokio::spawn(init.clone());
        let weak = Arc::downgrade(&self.inner);
        if let Some(rx) = self.inner.update_rx.lock().take() {
            super::mutation::spawn_update_actor(
                weak.clone(),
                self.inner.cancel.clone(),
                rx,
                init.clone(),
            );
        }
        if let Some(events) = self.inner.events.lock().take() {
            super::mutation::spawn_watch_pump(weak, self.inner.cancel.clone(), events);
        }
        init
    }

    /// Current build state.
    pub fn build_state(&self) -> BuildState {
        self.inner.state.borrow().clone()
    }

    /// Stream of build states, starting with the current one.
    pub fn subscribe(&self) -> watch::Receiver<BuildState> {
        self.inner.state.subscribe()
    }

    /// Stop the watch pump and update actor. Pending requests fail with
    /// [`GraphError::Closed`]. Dropping the last handle does the same.
    pub fn shutdown(&self) {
        info!("dependency graph shutting down");
        self.inner.cancel.cancel();
    }

    /// Start if needed, then wait until the index is ready and every change
    /// scheduled before this call has settled.
    pub(crate) async fn ready(&self) -> Result<(), GraphError> {
        let target = self.inner.scheduled.load(Ordering::SeqCst);
        let _ = self.start();
        let mut rx = self.inner.state.subscribe();

        let phase = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => return Err(GraphError::Closed),
            state = rx.wait_for(|s| s.phase.is_failed() || s.has_settled(target)) => {
                state.map_err(|_| GraphError::Closed)?.phase.clone()
            }
        };

        match phase {
            BuildPhase::Failed(err) => Err(GraphError::Init(err)),
            _ => Ok(()),
        }
    }
}

impl Inner {
    async fn initial_build(self: Arc<Self>) -> Result<(), Arc<InitError>> {
        let result = self.run_initial_build().await.map_err(Arc::new);
        match &result {
            Ok(()) => {
                info!(
                    files = self.snapshot.len(),
                    names = self.name_index.table().len(),
                    "dependency graph ready"
                );
                self.state.send_modify(|s| s.phase = BuildPhase::Ready);
            }
            Err(err) => {
                error!(error = %err, "dependency graph failed to initialize");
                let err = Arc::clone(err);
                self.state.send_modify(|s| s.phase = BuildPhase::Failed(err));
            }
        }
        result
    }

    async fn run_initial_build(&self) -> Result<(), InitError> {
        let roots = self.config.crawl_roots();
        info!(roots = ?roots, "crawling");
        let options = CrawlOptions {
            ignore: self.config.ignore_fn(),
            extensions: self.config.crawl_extensions(),
        };
        let files = Arc::new(crawl(&roots, options).await?);

        let index_build = async {
            self.snapshot.build(&files);
            self.rebuild_mocks();
            self.name_index.build().await?;
            Ok::<(), InitError>(())
        };

        let asset_build = async {
            if let Some(assets) = &self.assets {
                let assets = Arc::clone(assets);
                let files = Arc::clone(&files);
                tokio::task::spawn_blocking(move || assets.build(&files))
                    .await
                    .map_err(|e| InitError::Assets(e.to_string()))?;
            }
            Ok::<(), InitError>(())
        };

        tokio::try_join!(index_build, asset_build)?;
        Ok(())
    }

    /// Rescan the snapshot for mocks. No-op without a mock pattern.
    pub(crate) fn rebuild_mocks(&self) {
        if let Some(pattern) = self.config.mock_pattern() {
            let registry = MockRegistry::scan(&self.snapshot, pattern);
            info!(mocks = registry.len(), "mock registry built");
            self.mocks.store(Some(Arc::new(registry)));
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
