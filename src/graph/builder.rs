//! Mutable builder used to register nodes inside a [`ReverseGraph`](super::arena::ReverseGraph).

use anyhow::Result;

use crate::context::ExecutionContext;
use crate::error::GraphError;

use super::state::{GraphInner, NodeKind, NodeRecord};
use super::SignalId;

/// Context passed to graph capture closures for registering nodes.
pub struct GraphBuilder<'a> {
    pub(super) inner: &'a mut GraphInner,
}

impl<'a> GraphBuilder<'a> {
    /// Registers a lane source (or standalone anchor) and returns its signal.
    pub fn emit_leaf(&mut self, context: ExecutionContext) -> SignalId {
        self.emit(NodeKind::Leaf, context)
    }

    /// Registers a one-to-two fork below `upstream`.
    ///
    /// The returned signal is the value-side output and doubles as the
    /// planted completion that phony companions link to. The upstream node
    /// gains one registered consumer so it fires only once every fork and
    /// join below it has.
    pub fn emit_fork(
        &mut self,
        context: ExecutionContext,
        upstream: SignalId,
    ) -> Result<SignalId> {
        self.register_consumer(upstream)?;
        Ok(self.emit(NodeKind::Fork { upstream }, context))
    }

    /// Registers a two-to-one join gated on `gate`.
    ///
    /// `upstream` is the value side; pass `None` when the value carries no
    /// reverse history. The gate is looked up at firing time and is not a
    /// consumer relationship: the join never notifies it back.
    pub fn emit_join(
        &mut self,
        context: ExecutionContext,
        upstream: Option<SignalId>,
        gate: SignalId,
    ) -> Result<SignalId> {
        if !self.inner.nodes.contains_key(&gate) {
            return Err(GraphError::UnknownSignal(gate).into());
        }
        if let Some(upstream) = upstream {
            self.register_consumer(upstream)?;
        }
        Ok(self.emit(NodeKind::Join { upstream, gate }, context))
    }

    /// Returns the number of nodes registered so far.
    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    /// Returns `true` when no node has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    fn register_consumer(&mut self, signal: SignalId) -> Result<()> {
        let record = self
            .inner
            .nodes
            .get_mut(&signal)
            .ok_or(GraphError::UnknownSignal(signal))?;
        record.consumers += 1;
        Ok(())
    }

    fn emit(&mut self, kind: NodeKind, context: ExecutionContext) -> SignalId {
        let signal = self.allocate_signal();
        self.inner.nodes.insert(signal, NodeRecord::new(kind, context));
        self.inner.order.push(signal);
        signal
    }

    fn allocate_signal(&mut self) -> SignalId {
        let signal = SignalId(self.inner.next_signal);
        self.inner.next_signal += 1;
        signal
    }
}
