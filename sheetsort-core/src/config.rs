use serde::{Deserialize, Serialize};

/// Knobs that tune how a sheet's ordering is maintained and re-sorted.
///
/// All fields carry defaults so callers can supply partial configuration
/// payloads.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SortConfig {
    /// Record undo actions before the ordering is mutated.
    pub undo_enabled: bool,
    /// What happens when a sort is requested while another one is running.
    pub overlap_policy: OverlapPolicy,
    /// Label attached to the progress scope of every sort.
    pub progress_label: String,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            undo_enabled: true,
            overlap_policy: OverlapPolicy::default(),
            progress_label: "sorting".to_string(),
        }
    }
}

impl SortConfig {
    pub fn with_undo(mut self, enabled: bool) -> Self {
        self.undo_enabled = enabled;
        self
    }

    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }
}

/// Policy applied to overlapping sort requests on the same sheet.
///
/// Every policy serializes the actual reordering through the sheet's row
/// lock; they differ in what happens to the sort that is already running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Wait for in-flight sorts to finish, in submission order.
    Queue,
    /// Cancel in-flight sorts, then run the new one.
    #[default]
    Preempt,
    /// Refuse the new request while a sort is running.
    Reject,
}
