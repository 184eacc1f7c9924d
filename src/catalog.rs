//! Application catalog cache.
//!
//! The catalog is held as an immutable `Arc<Catalog>` snapshot. A refresh
//! builds a complete replacement off to the side and swaps the pointer, so
//! readers never see a half-built catalog. A refresh runs on its own task and
//! at most one is in flight; callers asking for a rebuild while one runs wait
//! on its result instead of enumerating again. Dropping a waiter never
//! cancels the refresh.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};
use rayon::prelude::*;
use tokio::sync::{broadcast, watch};

use crate::app::{ApplicationRecord, RawAppEntry};
use crate::error::CatalogError;
use crate::icon::{IconMaterializer, DEFAULT_ICON_SIZE_PX};
use crate::source::DirectorySource;

/// Events emitted when the catalog changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    /// A full refresh committed a new catalog.
    Refreshed { generation: u64, len: usize },
    /// A single record was resolved and cached.
    Inserted { package_id: String },
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Edge length passed to the icon materializer.
    pub icon_size_px: u32,
    /// The caller's own package, never listed.
    pub self_package: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            icon_size_px: DEFAULT_ICON_SIZE_PX,
            self_package: None,
        }
    }
}

/// Resolved records keyed by package id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    records: HashMap<String, ApplicationRecord>,
}

impl Catalog {
    /// Build a catalog; the first record seen for a package id wins.
    pub fn from_records(records: impl IntoIterator<Item = ApplicationRecord>) -> Self {
        let mut map = HashMap::new();
        for record in records {
            map.entry(record.package_id.clone()).or_insert(record);
        }
        Self { records: map }
    }

    pub fn get(&self, package_id: &str) -> Option<&ApplicationRecord> {
        self.records.get(package_id)
    }

    pub fn contains(&self, package_id: &str) -> bool {
        self.records.contains_key(package_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ApplicationRecord> {
        self.records.values()
    }

    fn insert(&mut self, record: ApplicationRecord) {
        self.records.insert(record.package_id.clone(), record);
    }
}

type RefreshOutcome = Option<Result<Arc<Catalog>, CatalogError>>;

/// How `fetch` treats the current snapshot and an in-flight refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Want {
    /// The current snapshot, building only if none exists.
    Cached,
    /// The current snapshot unless a refresh is in flight, then its result.
    Settled,
    /// A rebuilt catalog, joining an in-flight refresh if there is one.
    Rebuilt,
}

struct CacheState {
    source: Arc<dyn DirectorySource>,
    icons: Arc<dyn IconMaterializer>,
    config: CatalogConfig,
    /// `None` until the first successful full refresh.
    current: RwLock<Option<Arc<Catalog>>>,
    /// Records resolved by `get_one` before any full refresh.
    lookaside: RwLock<HashMap<String, ApplicationRecord>>,
    /// Result channel of the refresh in flight, if any.
    in_flight: Mutex<Option<watch::Receiver<RefreshOutcome>>>,
    generation: AtomicU64,
    event_tx: broadcast::Sender<CatalogEvent>,
}

/// Owns the catalog; all reads and mutations go through `get_all` and `get_one`.
pub struct CatalogCache {
    state: Arc<CacheState>,
}

impl CatalogCache {
    pub fn new(
        source: Arc<dyn DirectorySource>,
        icons: Arc<dyn IconMaterializer>,
        config: CatalogConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            state: Arc::new(CacheState {
                source,
                icons,
                config,
                current: RwLock::new(None),
                lookaside: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
                event_tx,
            }),
        }
    }

    /// The current catalog, if one has been built. Never blocks on a refresh.
    pub fn snapshot(&self) -> Option<Arc<Catalog>> {
        self.state.snapshot()
    }

    /// Number of committed full refreshes.
    pub fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::Acquire)
    }

    pub fn is_refreshing(&self) -> bool {
        self.state
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Subscribe to catalog changes.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.state.event_tx.subscribe()
    }

    /// Return the catalog, building it on first use or when `force_refresh`
    /// is set. A failed refresh leaves the previous catalog in place.
    pub async fn get_all(&self, force_refresh: bool) -> Result<Arc<Catalog>, CatalogError> {
        self.fetch(if force_refresh { Want::Rebuilt } else { Want::Cached })
            .await
    }

    /// Like `get_all(false)`, but waits for a refresh in flight instead of
    /// returning the catalog it is about to replace.
    pub async fn get_settled(&self) -> Result<Arc<Catalog>, CatalogError> {
        self.fetch(Want::Settled).await
    }

    /// Look up one package, resolving it directly from the source on a cache
    /// miss. Never triggers a full refresh.
    pub async fn get_one(&self, package_id: &str) -> Result<ApplicationRecord, CatalogError> {
        let state = &self.state;
        if state.is_self(package_id) {
            return Err(CatalogError::NotFound(package_id.to_string()));
        }

        if let Some(record) = state.cached(package_id) {
            return Ok(record);
        }

        debug!("{} not cached, resolving from {}", package_id, state.source.name());
        let source = Arc::clone(&state.source);
        let icons = Arc::clone(&state.icons);
        let size = state.config.icon_size_px;
        let id = package_id.to_string();
        let record = run_blocking(move || {
            let entry = source.resolve_one(&id)?;
            Ok(materialize(entry, icons.as_ref(), size))
        })
        .await?;

        {
            let mut current = state.current.write().unwrap_or_else(PoisonError::into_inner);
            match current.as_mut() {
                // Copy-on-write: outstanding snapshots keep their contents.
                Some(catalog) => Arc::make_mut(catalog).insert(record.clone()),
                None => {
                    state
                        .lookaside
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(record.package_id.clone(), record.clone());
                }
            }
        }

        let _ = state.event_tx.send(CatalogEvent::Inserted {
            package_id: record.package_id.clone(),
        });
        Ok(record)
    }

    async fn fetch(&self, want: Want) -> Result<Arc<Catalog>, CatalogError> {
        if want == Want::Cached {
            if let Some(catalog) = self.snapshot() {
                return Ok(catalog);
            }
        }

        let mut done = {
            let mut in_flight = self
                .state
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match in_flight.as_ref() {
                Some(pending) => {
                    debug!("joining refresh in flight");
                    pending.clone()
                }
                None => {
                    if want != Want::Rebuilt {
                        if let Some(catalog) = self.snapshot() {
                            return Ok(catalog);
                        }
                    }
                    let pending = CacheState::start_refresh(&self.state);
                    *in_flight = Some(pending.clone());
                    pending
                }
            }
        };

        let outcome = match done.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(result) => result,
            // The refresh task went away without reporting, e.g. on runtime shutdown.
            None => {
                self.state.clear_in_flight(&done);
                Err(CatalogError::Cancelled)
            }
        }
    }
}

impl CacheState {
    fn snapshot(&self) -> Option<Arc<Catalog>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Spawn the refresh task. The caller must hold the `in_flight` lock and
    /// store the returned receiver there.
    fn start_refresh(state: &Arc<Self>) -> watch::Receiver<RefreshOutcome> {
        let (tx, rx) = watch::channel(None);
        let task_state = Arc::clone(state);
        let own = rx.clone();
        tokio::spawn(async move {
            let outcome = task_state.rebuild().await;
            if let Err(e) = &outcome {
                warn!("catalog refresh failed: {}", e);
            }
            task_state.clear_in_flight(&own);
            let _ = tx.send(Some(outcome));
        });
        rx
    }

    fn clear_in_flight(&self, finished: &watch::Receiver<RefreshOutcome>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.as_ref().is_some_and(|rx| rx.same_channel(finished)) {
            *in_flight = None;
        }
    }

    async fn rebuild(&self) -> Result<Arc<Catalog>, CatalogError> {
        let catalog = Arc::new(self.build().await?);
        let len = catalog.len();
        let generation = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *current = Some(Arc::clone(&catalog));
            self.lookaside
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
            self.generation.fetch_add(1, Ordering::AcqRel) + 1
        };

        info!("catalog refresh {} complete: {} apps", generation, len);
        let _ = self.event_tx.send(CatalogEvent::Refreshed { generation, len });
        Ok(catalog)
    }

    fn cached(&self, package_id: &str) -> Option<ApplicationRecord> {
        if let Some(record) = self.snapshot().and_then(|c| c.get(package_id).cloned()) {
            return Some(record);
        }
        self.lookaside
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(package_id)
            .cloned()
    }

    fn is_self(&self, package_id: &str) -> bool {
        self.config.self_package.as_deref() == Some(package_id)
    }

    async fn build(&self) -> Result<Catalog, CatalogError> {
        let source = Arc::clone(&self.source);
        let icons = Arc::clone(&self.icons);
        let size = self.config.icon_size_px;
        let self_package = self.config.self_package.clone();

        info!("enumerating installed apps via {}", source.name());
        run_blocking(move || {
            let entries = source.enumerate_all()?;
            let records: Vec<ApplicationRecord> = entries
                .into_par_iter()
                .filter(|entry| self_package.as_deref() != Some(entry.package_id.as_str()))
                .map(|entry| materialize(entry, icons.as_ref(), size))
                .collect();
            Ok(Catalog::from_records(records))
        })
        .await
    }
}

fn materialize(entry: RawAppEntry, icons: &dyn IconMaterializer, size_px: u32) -> ApplicationRecord {
    let icon = icons.materialize(&entry.icon, size_px);
    ApplicationRecord {
        name: entry.name,
        package_id: entry.package_id,
        icon,
        is_system_app: entry.is_system_app,
        install_time_millis: entry.install_time_millis,
    }
}

/// Run blocking source work on the blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T, CatalogError>
where
    F: FnOnce() -> Result<T, CatalogError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(CatalogError::Cancelled),
        Err(e) => Err(CatalogError::SourceUnavailable(format!(
            "directory worker failed: {}",
            e
        ))),
    }
}
