//! Zero-payload placeholders that carry reverse-pass edges between lanes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::graph::SignalId;

/// A zero-size placeholder tied to one [`ExecutionContext`].
///
/// A phony never carries real payload; it exists solely so one lane can gate
/// its reverse-pass completion on another lane's. Instances returned by
/// [`ReverseGraph::phony`](crate::graph::ReverseGraph::phony) are shared and
/// must never be assumed unique; instances returned by
/// [`fork`](crate::dependency::fork) are fresh and link to the fork's planted
/// signal.
pub struct Phony {
    context: ExecutionContext,
    link: Option<PhonyLink>,
}

/// Graph linkage of an edge-carrying phony.
#[derive(Clone, Copy)]
pub(crate) struct PhonyLink {
    pub(crate) graph_id: usize,
    pub(crate) signal: SignalId,
}

impl Phony {
    pub(crate) fn dead(context: ExecutionContext) -> Self {
        Phony {
            context,
            link: None,
        }
    }

    pub(crate) fn linked(context: ExecutionContext, graph_id: usize, signal: SignalId) -> Self {
        Phony {
            context,
            link: Some(PhonyLink { graph_id, signal }),
        }
    }

    /// Context this phony was minted for.
    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Returns `true` when the phony carries a reverse-pass edge.
    pub fn participates(&self) -> bool {
        self.link.is_some()
    }

    /// Signal a join gates on when given this phony, if it carries one.
    ///
    /// For fork-minted phonies this is the fork's planted completion; for
    /// cached edge-carrying phonies it is the standalone anchor, which an
    /// embedder can seed directly to release every join gated on it.
    pub fn signal(&self) -> Option<SignalId> {
        self.link.map(|link| link.signal)
    }

    pub(crate) fn link(&self) -> Option<PhonyLink> {
        self.link
    }
}

impl fmt::Debug for Phony {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phony")
            .field("context", &self.context)
            .field("participates", &self.participates())
            .finish()
    }
}

/// Interning cache for shared phonies, keyed by `(context, requires_reverse_edge)`.
///
/// Entries are never evicted; repeated requests for a key must observe the
/// same instance for the owning graph's lifetime.
pub(crate) struct PhonyCache {
    entries: HashMap<(ExecutionContext, bool), Arc<Phony>>,
}

impl PhonyCache {
    pub(crate) fn new() -> Self {
        PhonyCache {
            entries: HashMap::new(),
        }
    }

    /// Insert-if-absent lookup. The owning mutex serializes first use, so
    /// every caller for the same key observes the same instance.
    pub(crate) fn get_or_insert<F>(
        &mut self,
        context: ExecutionContext,
        requires_reverse_edge: bool,
        mint: F,
    ) -> Arc<Phony>
    where
        F: FnOnce() -> Phony,
    {
        Arc::clone(
            self.entries
                .entry((context, requires_reverse_edge))
                .or_insert_with(|| Arc::new(mint())),
        )
    }
}
