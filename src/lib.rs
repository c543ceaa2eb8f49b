pub mod context;
pub mod dependency;
mod env;
pub mod error;
pub mod graph;
pub mod phony;
pub mod tracking;
pub mod value;

pub use context::ExecutionContext;
pub use dependency::{fork, join};
pub use error::GraphError;
pub use graph::{PassReport, ReverseGraph, SignalId};
pub use phony::Phony;
pub use value::LaneValue;
