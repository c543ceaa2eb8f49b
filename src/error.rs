//! Typed failures raised at graph-construction preconditions.

use thiserror::Error;

use crate::graph::SignalId;

/// Programming-error-class precondition violations.
///
/// Dead-path degeneration (fork/join with tracking disabled) is not an error,
/// and an unmet dependency never raises; it surfaces as a parked join.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("value is not linked to a reverse graph")]
    Detached,
    #[error("phony minted by reverse graph {phony_graph} cannot be used with graph {graph}")]
    GraphMismatch { phony_graph: usize, graph: usize },
    #[error("cannot gate a value on a phony planted by its own producer")]
    SelfDependency,
    #[error("signal {0:?} is not registered in this graph")]
    UnknownSignal(SignalId),
}
