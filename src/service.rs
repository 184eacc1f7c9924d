//! Installed-apps service: the observable list plus single-app details.

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::app::ApplicationRecord;
use crate::catalog::CatalogCache;
use crate::error::CatalogError;
use crate::query::{self, FilterSpec, SortSpec};
use crate::state::{Observed, StateProjector};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveQuery {
    pub filter: FilterSpec,
    pub sort: SortSpec,
}

pub struct InstalledApps {
    cache: Arc<CatalogCache>,
    active: Mutex<ActiveQuery>,
    list: StateProjector<Vec<ApplicationRecord>>,
    details: StateProjector<ApplicationRecord>,
}

impl InstalledApps {
    pub fn new(cache: Arc<CatalogCache>) -> Self {
        Self {
            cache,
            active: Mutex::new(ActiveQuery::default()),
            list: StateProjector::with_describer(|err| match err {
                CatalogError::NotFound(_) => err.to_string(),
                other => format!("Failed to get installed apps: {}", other),
            }),
            details: StateProjector::new(),
        }
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    pub fn active_query(&self) -> ActiveQuery {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The installed-apps list, re-emitted on every query change.
    pub fn subscribe(&self) -> watch::Receiver<Observed<Vec<ApplicationRecord>>> {
        self.list.subscribe()
    }

    /// Details for the package most recently passed to `show_details`.
    pub fn subscribe_details(&self) -> watch::Receiver<Observed<ApplicationRecord>> {
        self.details.subscribe()
    }

    /// Issue the active query against the cached catalog.
    pub fn load(&self) {
        self.issue(false);
    }

    /// Rebuild the catalog and re-issue the active query.
    pub fn refresh(&self) {
        self.issue(true);
    }

    pub fn set_filter(&self, filter: FilterSpec) {
        self.update(|q| q.filter = filter);
    }

    pub fn set_sort(&self, sort: SortSpec) {
        self.update(|q| q.sort = sort);
    }

    pub fn set_query(&self, filter: FilterSpec, sort: SortSpec) {
        self.update(|q| {
            q.filter = filter;
            q.sort = sort;
        });
    }

    pub fn show_details(&self, package_id: &str) {
        let cache = Arc::clone(&self.cache);
        let id = package_id.to_string();
        self.details.submit(async move {
            cache.get_one(&id).await.map_err(|err| match err {
                CatalogError::SourceUnavailable(reason) => CatalogError::SourceUnavailable(
                    format!("Failed to get app details for '{}': {}", id, reason),
                ),
                other => other,
            })
        });
    }

    /// Re-issue the active query whenever the catalog changes. The task ends
    /// when the service is dropped.
    pub fn follow_catalog(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.cache.subscribe();
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => debug!("catalog changed: {:?}", event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("missed {} catalog events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let Some(service) = service.upgrade() else {
                    break;
                };
                service.load();
            }
        })
    }

    fn update(&self, change: impl FnOnce(&mut ActiveQuery)) {
        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            change(&mut active);
        }
        self.load();
    }

    fn issue(&self, force_refresh: bool) {
        let ActiveQuery { filter, sort } = self.active_query();
        let cache = Arc::clone(&self.cache);
        debug!("query filter={} sort={} force={}", filter, sort, force_refresh);
        self.list.submit(async move {
            // A superseded refresh keeps running; later queries wait on it.
            let catalog = if force_refresh {
                cache.get_all(true).await?
            } else {
                cache.get_settled().await?
            };
            Ok(query::apply(&catalog, filter, sort))
        });
    }
}
