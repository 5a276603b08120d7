//! Diagnostics engine for lintlens - aggregation, grouping and refresh.
//!
//! This crate has no rendering. The host supplies producers and the
//! [`HostSinks`] and gets notified when the grouped view changes:
//!
//! - [`Aggregator`] runs the producers and turns their output into records.
//! - [`group`] arranges records into the tree for a [`GroupMode`].
//! - [`RefreshCoordinator`] debounces refresh requests and owns the scan
//!   lifecycle, built on the pure [`ScanState`] machine.
//!
//! [`GroupMode`]: lintlens_types::GroupMode

pub mod aggregator;
pub mod coordinator;
pub mod error;
pub mod exclude;
pub mod grouping;
pub mod host;
pub mod scan_state;

pub use aggregator::{Aggregator, Collection, DiagnosticFilters, normalize};
pub use coordinator::{RefreshCoordinator, ScanSnapshot};
pub use error::ScanError;
pub use exclude::ExcludeMatcher;
pub use grouping::{GroupedView, group, rule_label};
pub use host::{BadgeSink, DisplaySurface, HostSinks, Notifier};
pub use scan_state::{Phase, RefreshAction, RefreshTimings, ScanCompletion, ScanState};
