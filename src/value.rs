//! Lane-local values carrying an opaque payload and reverse-pass linkage.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::context::ExecutionContext;
use crate::error::GraphError;
use crate::graph::{PassReport, ReverseGraph, SignalId};

/// A value flowing through one execution lane.
///
/// The payload is opaque to the graph; only the producer link participates in
/// reverse passes, so every linkage operation is metadata-only and the
/// payload moves through untouched.
pub struct LaneValue<P> {
    graph: Arc<ReverseGraph>,
    context: ExecutionContext,
    payload: P,
    node: Option<SignalId>,
}

impl<P: Clone> Clone for LaneValue<P> {
    fn clone(&self) -> Self {
        LaneValue {
            graph: Arc::clone(&self.graph),
            context: self.context,
            payload: self.payload.clone(),
            node: self.node,
        }
    }
}

impl<P> LaneValue<P> {
    /// Registers a lane source in `graph` and wraps `payload` as its value.
    pub fn source(
        graph: &Arc<ReverseGraph>,
        context: ExecutionContext,
        payload: P,
    ) -> Result<Self> {
        let node = graph.capture(|builder| Ok(builder.emit_leaf(context)))?;
        Ok(LaneValue {
            graph: Arc::clone(graph),
            context,
            payload,
            node: Some(node),
        })
    }

    /// Wraps `payload` without reverse-pass participation.
    pub fn untracked(graph: &Arc<ReverseGraph>, context: ExecutionContext, payload: P) -> Self {
        LaneValue {
            graph: Arc::clone(graph),
            context,
            payload,
            node: None,
        }
    }

    /// Borrows the raw payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Consumes the value, returning the raw payload.
    pub fn into_payload(self) -> P {
        self.payload
    }

    /// Context the value is scheduled in.
    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Returns the owning graph handle.
    pub fn graph(&self) -> Arc<ReverseGraph> {
        Arc::clone(&self.graph)
    }

    /// Producer signal when the value participates in the reverse pass.
    pub fn signal(&self) -> Option<SignalId> {
        self.node
    }

    /// Returns `true` while the value is linked to a producer in the graph.
    pub fn is_tracked(&self) -> bool {
        self.node.is_some()
    }

    /// Strips the producer link, keeping the payload untouched.
    pub fn detach(self) -> Self {
        LaneValue { node: None, ..self }
    }

    /// Attaches a hook that runs when the producer's reverse work completes.
    ///
    /// Hooks registered after the producer already fired run immediately.
    pub fn on_complete<F>(&self, hook: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let signal = self.node.ok_or(GraphError::Detached)?;
        self.graph.on_complete(signal, hook)
    }

    /// Seeds a reverse pass at this value's producer and drains it.
    pub fn run_reverse(&self) -> Result<PassReport> {
        let signal = self.node.ok_or(GraphError::Detached)?;
        self.graph.run_from(&[signal])
    }

    /// Rebinds the producer link, leaving everything else in place.
    pub(crate) fn relink(self, node: Option<SignalId>) -> Self {
        LaneValue { node, ..self }
    }
}

impl<P> fmt::Debug for LaneValue<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaneValue")
            .field("context", &self.context)
            .field("tracked", &self.is_tracked())
            .finish()
    }
}
