//! Arbitrary ordering dependencies between two execution lanes.
//!
//! [`fork`] branches a completion signal out of one lane and [`join`] gates
//! another lane's reverse pass on it. Both are identity on the forward
//! payload; the interesting behavior lives entirely in how reverse-pass
//! completion is wired. A fork forwards its upstream notification exactly
//! once no matter which side reaches it first; a join fires only once both
//! its value-side notification and the phony's planted signal have arrived,
//! and forwards only the value side.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::error::GraphError;
use crate::phony::Phony;
use crate::tracking;
use crate::value::LaneValue;

/// Branches a completion signal out of `value`'s lane.
///
/// Returns the value, its reverse history rerouted through the new fork
/// node, together with a phony companion whose planted signal another lane
/// can gate on via [`join`]. When reverse tracking is paused or `value`
/// carries no history, no node is allocated and the companion is the dead
/// cached phony for the value's context.
pub fn fork<P>(value: LaneValue<P>) -> Result<(LaneValue<P>, Arc<Phony>)> {
    let graph = value.graph();
    let context = value.context();
    let upstream = match value.signal() {
        Some(signal) if tracking::tracking_enabled() => signal,
        _ => {
            let phony = graph.phony(context, false);
            return Ok((value, phony));
        }
    };

    let fork = graph.capture(|builder| builder.emit_fork(context, upstream))?;
    let phony = Arc::new(Phony::linked(context, graph.id(), fork));
    Ok((value.relink(Some(fork)), phony))
}

/// Gates `value`'s reverse-pass completion on `phony`'s planted signal.
///
/// The output's forward payload is the input payload, untouched. When reverse
/// tracking is paused or the phony carries no reverse edge, the value is
/// returned unchanged and no node is allocated. A phony minted by another
/// graph, or planted by `value`'s own producer, is rejected eagerly.
///
/// If the phony's signal never fires, the join never fires either: that
/// lane's reverse pass parks on a real unmet dependency, which callers
/// observe through their own completion policy rather than a timeout.
pub fn join<P>(value: LaneValue<P>, phony: &Phony) -> Result<LaneValue<P>> {
    let link = match phony.link() {
        Some(link) if tracking::tracking_enabled() => link,
        _ => return Ok(value),
    };

    let graph = value.graph();
    if link.graph_id != graph.id() {
        bail!(GraphError::GraphMismatch {
            phony_graph: link.graph_id,
            graph: graph.id(),
        });
    }
    if value.signal() == Some(link.signal) {
        bail!(GraphError::SelfDependency);
    }

    let context = value.context();
    let upstream = value.signal();
    let joined = graph.capture(|builder| builder.emit_join(context, upstream, link.signal))?;
    Ok(value.relink(Some(joined)))
}
