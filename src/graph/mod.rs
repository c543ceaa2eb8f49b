//! Reverse-pass dependency graph infrastructure.
//!
//! The graph layer records completion signals as arena-backed nodes, allowing
//! the fork/join primitives to stitch ordering constraints between lanes
//! without barriers. Builders register nodes, and the arena drains seeded
//! passes to quiescence when a lane triggers its reverse pass.
mod arena;
mod builder;
mod state;
pub mod trace;

pub use arena::{PassReport, ReverseGraph};
pub use builder::GraphBuilder;

use serde::{Deserialize, Serialize};

/// Identifier of one completion signal inside a [`ReverseGraph`].
///
/// Every registered node owns exactly one signal; a signal fires at most once
/// for the lifetime of the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(pub u32);
