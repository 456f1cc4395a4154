//! Loading/error bookkeeping shared by every resource store.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::ErrorStore;
use crate::api::ApiError;

/// What every store action returns: the data, or the already-recorded error.
pub type ActionResult<T> = Result<T, ApiError>;

#[derive(Debug, Default)]
struct StateInner {
    loading: HashSet<&'static str>,
    error: Option<ApiError>,
}

/// Per-store `loading` flags keyed by operation name, plus the last error.
#[derive(Debug)]
pub struct StoreState {
    name: &'static str,
    inner: Mutex<StateInner>,
    errors: Arc<ErrorStore>,
}

/// Clears the loading flag even if the action future is dropped mid-way.
struct LoadingGuard<'a> {
    state: &'a StoreState,
    op: &'static str,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.inner().loading.remove(self.op);
    }
}

impl StoreState {
    pub fn new(name: &'static str, errors: Arc<ErrorStore>) -> Self {
        Self {
            name,
            inner: Mutex::new(StateInner::default()),
            errors,
        }
    }

    fn inner(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one action: mark `op` loading, clear the previous error, and
    /// record the failure (here and in the shared error log) if there is one.
    pub async fn run<T, F>(&self, op: &'static str, action: F) -> ActionResult<T>
    where
        F: Future<Output = ActionResult<T>>,
    {
        {
            let mut inner = self.inner();
            inner.loading.insert(op);
            inner.error = None;
        }
        let _guard = LoadingGuard { state: self, op };

        let result = action.await;
        if let Err(ref err) = result {
            self.record(op, err);
        }
        result
    }

    /// Record a failure that happened outside `run`, e.g. failed validation.
    pub fn record(&self, op: &'static str, err: &ApiError) {
        self.inner().error = Some(err.clone());
        self.errors.push(format!("{}.{}", self.name, op), err);
    }

    pub fn is_loading(&self, op: &str) -> bool {
        self.inner().loading.contains(op)
    }

    pub fn any_loading(&self) -> bool {
        !self.inner().loading.is_empty()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.inner().error.clone()
    }

    pub fn clear_error(&self) {
        self.inner().error = None;
    }
}
