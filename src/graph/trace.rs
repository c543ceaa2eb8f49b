//! Observer hooks notified around each reverse pass.
//!
//! Embedders install a process-wide [`PassSink`] to watch passes drain:
//! schedulers use it to surface stalled lanes, tests to assert on pass
//! outcomes. No sink is installed by default and the drain path pays only an
//! uncontended lock to find that out.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::SignalId;

/// Identifying details of one reverse pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassContext {
    pub pass_id: u64,
    pub graph_id: usize,
    pub roots: Vec<SignalId>,
    pub timestamp: SystemTime,
}

/// Outcome of one drained reverse pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassStats {
    pub duration: Duration,
    pub fired: usize,
    pub parked: usize,
    pub absorbed: usize,
    pub status: PassStatus,
}

/// Quiescence state of the graph when a pass finished draining.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassStatus {
    /// Every signal the pass reached has fired.
    Drained,
    /// Joins remain parked on unfired gates.
    Parked { waiting: usize },
}

/// Observer notified before and after each reverse pass.
pub trait PassSink: Send + Sync {
    fn before_pass(&self, context: &PassContext);
    fn after_pass(&self, context: &PassContext, stats: &PassStats);
}

static PASS_SINK: Mutex<Option<Arc<dyn PassSink>>> = Mutex::new(None);
static PASS_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Installs the process-wide pass sink, replacing any previous one.
pub fn set_sink(sink: Arc<dyn PassSink>) {
    *PASS_SINK.lock().expect("pass sink poisoned") = Some(sink);
}

/// Removes the installed pass sink.
pub fn clear_sink() {
    *PASS_SINK.lock().expect("pass sink poisoned") = None;
}

/// Returns the currently installed sink, if any.
pub fn current_sink() -> Option<Arc<dyn PassSink>> {
    PASS_SINK.lock().expect("pass sink poisoned").clone()
}

pub(super) fn next_pass_id() -> u64 {
    PASS_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed)
}
