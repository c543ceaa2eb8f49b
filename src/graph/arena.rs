//! Shared arena that stores reverse-pass dependency graphs and drains
//! completion passes over them.
//!
//! The reverse graph is the central orchestrator for cross-lane ordering. It
//! owns every registered node, serializes mutation behind a mutex, and walks
//! seeded completion passes to quiescence.
//!
//! ## Architecture
//!
//! ```text
//! LaneValue
//!      |
//!      | contains Arc<ReverseGraph>
//!      v
//! ReverseGraph
//!      |
//!      +-- GraphInner (nodes, insertion order, parked joins)
//!      |
//!      +-- PhonyCache (interned placeholders per context)
//!      |
//!      +-- trace sink (pass observability)
//! ```
//!
//! ## Completion model
//!
//! 1. **Register**: fork/join call `graph.capture()` to record nodes
//! 2. **Seed**: a lane triggers its reverse pass at one or more signals
//! 3. **Drain**: notifications propagate consumer-to-producer; a node fires
//!    once all registered consumers have notified it
//! 4. **Park**: a join whose gate has not fired waits structurally; firing
//!    the gate later resumes it inside that drain
//!
//! Signals fire at most once for the lifetime of the graph. Notifications
//! delivered to an already-fired signal are absorbed, which makes re-running
//! a drained root a no-op and keeps forks from double-firing their upstream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::GraphError;
use crate::phony::{Phony, PhonyCache};

use super::builder::GraphBuilder;
use super::state::{CompletionHook, GraphInner, NodeKind, SignalState};
use super::trace::{self, PassContext, PassStats, PassStatus};
use super::SignalId;

static GRAPH_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Central storage for one reverse-pass dependency graph.
pub struct ReverseGraph {
    inner: Mutex<GraphInner>,
    phonies: Mutex<PhonyCache>,
    id: usize,
}

/// Summary of one reverse-pass drain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Signals that fired during this drain, resumed joins included.
    pub fired: usize,
    /// Joins newly parked on an unfired gate.
    pub parked: usize,
    /// Notifications absorbed by already-fired or already-waiting signals.
    pub absorbed: usize,
}

/// Internal drain step: a fresh notification or a parked join resuming.
enum Step {
    Notify(SignalId),
    Resume(SignalId),
}

impl Step {
    fn signal(&self) -> SignalId {
        match *self {
            Step::Notify(signal) | Step::Resume(signal) => signal,
        }
    }
}

impl ReverseGraph {
    /// Creates an empty graph ready for node registration.
    pub fn new() -> Arc<Self> {
        let id = GRAPH_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
        Arc::new(ReverseGraph {
            inner: Mutex::new(GraphInner::new()),
            phonies: Mutex::new(PhonyCache::new()),
            id,
        })
    }

    /// Process-unique identity used to reject cross-graph wiring.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Captures a sequence of node registrations, exposing a [`GraphBuilder`]
    /// to the caller. Registrations are visible to later passes as soon as
    /// the closure returns.
    pub fn capture<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut GraphBuilder<'_>) -> Result<R>,
    {
        let mut inner = self.inner.lock().expect("reverse graph poisoned");
        let mut builder = GraphBuilder { inner: &mut inner };
        f(&mut builder)
    }

    /// Returns the number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.inner.lock().expect("reverse graph poisoned").nodes.len()
    }

    /// Returns the number of joins currently parked on an unfired gate.
    ///
    /// A nonzero count after all lanes drained means an ordering dependency
    /// was never met; surfacing that is the caller's completion policy, not
    /// this graph's.
    pub fn waiting(&self) -> usize {
        let inner = self.inner.lock().expect("reverse graph poisoned");
        inner.waiters.values().map(|parked| parked.len()).sum()
    }

    /// Returns the parked joins in registration order.
    pub fn parked(&self) -> Vec<SignalId> {
        let inner = self.inner.lock().expect("reverse graph poisoned");
        inner
            .order
            .iter()
            .copied()
            .filter(|signal| {
                inner
                    .nodes
                    .get(signal)
                    .map(|record| record.parked)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Returns `true` once `signal` has fired.
    pub fn fired(&self, signal: SignalId) -> Result<bool> {
        let inner = self.inner.lock().expect("reverse graph poisoned");
        match inner.nodes.get(&signal) {
            Some(record) => Ok(matches!(record.state, SignalState::Fired)),
            None => bail!(GraphError::UnknownSignal(signal)),
        }
    }

    /// Returns the context the node owning `signal` was registered for.
    pub fn context_of(&self, signal: SignalId) -> Result<ExecutionContext> {
        let inner = self.inner.lock().expect("reverse graph poisoned");
        match inner.nodes.get(&signal) {
            Some(record) => Ok(record.context),
            None => bail!(GraphError::UnknownSignal(signal)),
        }
    }

    /// Attaches a completion hook to `signal`.
    ///
    /// Hooks run after the graph lock is released, in firing order. A hook
    /// registered on an already-fired signal is invoked immediately.
    pub fn on_complete<F>(&self, signal: SignalId, hook: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let late = {
            let mut inner = self.inner.lock().expect("reverse graph poisoned");
            let record = inner
                .nodes
                .get_mut(&signal)
                .ok_or(GraphError::UnknownSignal(signal))?;
            match record.state {
                SignalState::Pending => {
                    record.hooks.push(Box::new(hook));
                    None
                }
                SignalState::Fired => Some(hook),
            }
        };
        if let Some(hook) = late {
            hook();
        }
        Ok(())
    }

    /// Returns the shared phony for `(context, requires_reverse_edge)`.
    ///
    /// The first request per key mints the entry under the cache lock, so
    /// concurrent first use still observes a single instance. Edge-carrying
    /// phonies anchor to a dedicated leaf node registered on first use; the
    /// anchor fires only if a pass seeds it, and a join gated on a never-fired
    /// anchor stalls by design.
    pub fn phony(&self, context: ExecutionContext, requires_reverse_edge: bool) -> Arc<Phony> {
        let mut cache = self.phonies.lock().expect("phony cache poisoned");
        cache.get_or_insert(context, requires_reverse_edge, || {
            if requires_reverse_edge {
                let mut inner = self.inner.lock().expect("reverse graph poisoned");
                let mut builder = GraphBuilder { inner: &mut inner };
                let anchor = builder.emit_leaf(context);
                Phony::linked(context, self.id, anchor)
            } else {
                Phony::dead(context)
            }
        })
    }

    /// Seeds a reverse pass at `roots` and drains it to quiescence.
    ///
    /// A seed counts as one notification toward each root. Joins whose gate
    /// has not fired park instead of blocking a thread; a later pass that
    /// fires the gate resumes them inside its own drain. Completion hooks of
    /// everything that fired run after the lock is released, in firing order.
    pub fn run_from(&self, roots: &[SignalId]) -> Result<PassReport> {
        let sink = trace::current_sink();
        let pass_context = PassContext {
            pass_id: trace::next_pass_id(),
            graph_id: self.id,
            roots: roots.to_vec(),
            timestamp: std::time::SystemTime::now(),
        };
        if let Some(ref sink) = sink {
            sink.before_pass(&pass_context);
        }

        let start = Instant::now();
        let (report, hooks, still_waiting) = self.drain(roots)?;
        for hook in &hooks {
            hook();
        }

        if let Some(ref sink) = sink {
            let status = if still_waiting == 0 {
                PassStatus::Drained
            } else {
                PassStatus::Parked {
                    waiting: still_waiting,
                }
            };
            sink.after_pass(
                &pass_context,
                &PassStats {
                    duration: start.elapsed(),
                    fired: report.fired,
                    parked: report.parked,
                    absorbed: report.absorbed,
                    status,
                },
            );
        }

        Ok(report)
    }

    /// Walks notifications consumer-to-producer until the queue is empty.
    /// Returns the fired hooks so the caller can run them outside the lock.
    fn drain(&self, roots: &[SignalId]) -> Result<(PassReport, Vec<CompletionHook>, usize)> {
        let mut inner = self.inner.lock().expect("reverse graph poisoned");
        let mut report = PassReport::default();
        let mut hooks: Vec<CompletionHook> = Vec::new();
        let mut queue: VecDeque<Step> = VecDeque::new();

        for root in roots {
            if !inner.nodes.contains_key(root) {
                bail!(GraphError::UnknownSignal(*root));
            }
            queue.push_back(Step::Notify(*root));
        }

        while let Some(step) = queue.pop_front() {
            let signal = step.signal();

            let (kind, ready) = {
                let record = inner
                    .nodes
                    .get_mut(&signal)
                    .ok_or(GraphError::UnknownSignal(signal))?;
                if matches!(record.state, SignalState::Fired) {
                    report.absorbed += 1;
                    continue;
                }
                match step {
                    Step::Notify(_) => {
                        if record.parked {
                            // Already satisfied on the value side, still gated.
                            report.absorbed += 1;
                            continue;
                        }
                        record.received += 1;
                        (record.kind, record.received >= record.required())
                    }
                    Step::Resume(_) => {
                        record.parked = false;
                        (record.kind, true)
                    }
                }
            };
            if !ready {
                continue;
            }

            if let NodeKind::Join { gate, .. } = kind {
                let gate_open = match inner.nodes.get(&gate) {
                    Some(gate_record) => matches!(gate_record.state, SignalState::Fired),
                    None => bail!(GraphError::UnknownSignal(gate)),
                };
                if !gate_open {
                    let record = inner.nodes.get_mut(&signal).expect("join vanished");
                    record.parked = true;
                    inner.waiters.entry(gate).or_default().push(signal);
                    report.parked += 1;
                    continue;
                }
            }

            let record = inner.nodes.get_mut(&signal).expect("node vanished");
            record.state = SignalState::Fired;
            hooks.append(&mut record.hooks);
            report.fired += 1;

            match kind {
                NodeKind::Leaf => {}
                NodeKind::Fork { upstream } => queue.push_back(Step::Notify(upstream)),
                NodeKind::Join { upstream, .. } => {
                    if let Some(upstream) = upstream {
                        queue.push_back(Step::Notify(upstream));
                    }
                }
            }

            if let Some(waiters) = inner.waiters.remove(&signal) {
                for waiter in waiters {
                    queue.push_back(Step::Resume(waiter));
                }
            }
        }

        let still_waiting = inner.waiters.values().map(|parked| parked.len()).sum();
        Ok((report, hooks, still_waiting))
    }
}
