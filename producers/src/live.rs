//! Live diagnostics store - per-file diagnostics pushed by the host.
//!
//! Editors already publish diagnostics for open files as the user types. In
//! open-files scan mode the aggregator reads this store instead of running
//! the external engines.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::{DiagnosticProducer, ProducerFut, ProducerOutput, ProducerRequest, RawDiagnostic};

pub const LIVE_PRODUCER_ID: &str = "live";

#[derive(Default)]
pub struct LiveDiagnosticsStore {
    data: Mutex<HashMap<PathBuf, Vec<RawDiagnostic>>>,
}

impl LiveDiagnosticsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything known about `path`. An empty list forgets the file.
    pub fn update(&self, path: PathBuf, items: Vec<RawDiagnostic>) {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        if items.is_empty() {
            data.remove(&path);
        } else {
            data.insert(path, items);
        }
    }

    /// Forget a closed file.
    pub fn remove(&self, path: &Path) {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }

    pub fn clear(&self) {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Point-in-time copy of the store.
    #[must_use]
    pub fn snapshot(&self) -> ProducerOutput {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        ProducerOutput {
            files: data
                .iter()
                .map(|(path, items)| (path.clone(), items.clone()))
                .collect(),
            global: Vec::new(),
        }
    }
}

impl DiagnosticProducer for LiveDiagnosticsStore {
    fn id(&self) -> &str {
        LIVE_PRODUCER_ID
    }

    fn get_all_diagnostics<'a>(&'a self, _request: &'a ProducerRequest) -> ProducerFut<'a> {
        Box::pin(async move { Ok(self.snapshot()) })
    }
}
