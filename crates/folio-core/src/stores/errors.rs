//! Application-wide log of recent failures.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::api::{ApiError, ErrorBody};

/// Only the most recent failures are kept.
const MAX_ERROR_RECORDS: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// `"<store>.<operation>"`
    pub source: String,
    pub error: ErrorBody,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ErrorStore {
    records: Mutex<VecDeque<ErrorRecord>>,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, VecDeque<ErrorRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, source: impl Into<String>, err: &ApiError) {
        let source = source.into();
        warn!(source = %source, status = err.status(), detail = %err.detail(), "Action failed");

        let mut records = self.records();
        if records.len() == MAX_ERROR_RECORDS {
            records.pop_front();
        }
        records.push_back(ErrorRecord {
            source,
            error: err.body(),
            at: Utc::now(),
        });
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<ErrorRecord> {
        self.records().iter().rev().take(limit).cloned().collect()
    }

    pub fn last(&self) -> Option<ErrorRecord> {
        self.records().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn clear(&self) {
        self.records().clear();
    }
}
