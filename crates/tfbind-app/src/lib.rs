//! tfbind-app
//!
//! Orchestration on top of the models: a loaded [`TfBindContext`], panel
//! comparison, promoter scans, chart rendering and a single-job [`Session`].
//!
pub mod compare;
pub mod context;
pub mod plot;
pub mod scan;
pub mod session;

pub use compare::{compare_against_panel, PanelEntry, PanelRecord, CURRENT_TF_LABEL, DEFAULT_PANEL};
pub use context::{Prediction, TfBindContext};
pub use plot::BarChart;
pub use scan::{scan_region, scan_sequence, PromoterPreset, ScanPoint, ScanRequest};
pub use session::{JobHandle, Session};

#[cfg(test)]
pub(crate) mod test_utils;
