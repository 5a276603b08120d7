//! Sinks the host implements. The coordinator's side effects all go through
//! these; it never renders anything itself.

use std::sync::Arc;

use lintlens_types::{BadgeState, DiagnosticRecord};

/// The tree view (or whatever stands in for it).
pub trait DisplaySurface: Send + Sync {
    /// The grouped tree changed. The surface pulls a fresh snapshot.
    fn data_changed(&self);

    /// Make `record` visible and selected.
    fn reveal(&self, record: &DiagnosticRecord);

    /// The last scan failed outright; show `message` instead of a tree.
    fn show_error(&self, message: &str);
}

pub trait BadgeSink: Send + Sync {
    fn set_badge(&self, badge: BadgeState);
}

/// One-off, user-visible notices (e.g. a producer that could not run).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// The three sinks bundled for the coordinator.
#[derive(Clone)]
pub struct HostSinks {
    pub display: Arc<dyn DisplaySurface>,
    pub badge: Arc<dyn BadgeSink>,
    pub notifier: Arc<dyn Notifier>,
}
