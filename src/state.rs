//! Projection of asynchronous fetches into a loading/success/error stream.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum QueryResult<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> QueryResult<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryResult::Loading)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_loading()
    }
}

/// The observed value: `None` until the first query is issued.
pub type Observed<T> = Option<QueryResult<T>>;

type Describe = dyn Fn(&CatalogError) -> String + Send + Sync;

/// Turns a producer future into `Loading` followed by exactly one terminal
/// state. Submitting a new producer aborts the previous one; only the latest
/// submission can ever publish a terminal state.
pub struct StateProjector<T> {
    tx: Arc<watch::Sender<Observed<T>>>,
    ticket: Arc<AtomicU64>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    describe: Arc<Describe>,
}

impl<T> StateProjector<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_describer(|err| err.to_string())
    }

    /// Use `describe` to turn failures into the message carried by `Error`.
    pub fn with_describer<F>(describe: F) -> Self
    where
        F: Fn(&CatalogError) -> String + Send + Sync + 'static,
    {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            ticket: Arc::new(AtomicU64::new(0)),
            in_flight: Mutex::new(None),
            describe: Arc::new(describe),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Observed<T>> {
        self.tx.subscribe()
    }

    /// Number of queries issued so far.
    pub fn issued(&self) -> u64 {
        self.ticket.load(Ordering::Acquire)
    }

    /// Start a new query. Must be called from within a Tokio runtime.
    pub fn submit<F>(&self, producer: F) -> u64
    where
        F: Future<Output = Result<T, CatalogError>> + Send + 'static,
    {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = in_flight.take() {
            previous.abort();
        }

        // The ticket moves under the watch lock, so a stale task checking it
        // in `send_if_modified` can never slip in after this Loading.
        let mut ticket = 0;
        self.tx.send_modify(|state| {
            ticket = self.ticket.fetch_add(1, Ordering::AcqRel) + 1;
            *state = Some(QueryResult::Loading);
        });

        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.ticket);
        let describe = Arc::clone(&self.describe);
        *in_flight = Some(tokio::spawn(async move {
            let next = match producer.await {
                Ok(value) => QueryResult::Success(value),
                Err(CatalogError::Cancelled) => {
                    debug!("query {} cancelled", ticket);
                    return;
                }
                Err(err) => QueryResult::Error(describe(&err)),
            };

            let published = tx.send_if_modified(|state| {
                if current.load(Ordering::Acquire) != ticket {
                    return false;
                }
                *state = Some(next);
                true
            });
            if !published {
                debug!("query {} superseded, result dropped", ticket);
            }
        }));

        ticket
    }
}

impl<T> Default for StateProjector<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for StateProjector<T> {
    fn drop(&mut self) {
        let in_flight = self
            .in_flight
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = in_flight.take() {
            handle.abort();
        }
    }
}

/// Wait until the observed state is terminal and return it. Returns `None`
/// if the projector was dropped first.
pub async fn settled<T: Clone>(rx: &mut watch::Receiver<Observed<T>>) -> Option<QueryResult<T>> {
    let state = rx
        .wait_for(|state| matches!(state, Some(result) if result.is_terminal()))
        .await
        .ok()?;
    state.clone()
}
