use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use lanelink::{fork, join, tracking, ExecutionContext, GraphError, LaneValue, ReverseGraph};

fn observe<P>(value: &LaneValue<P>) -> Result<Arc<AtomicUsize>> {
    let fired = Arc::new(AtomicUsize::new(0));
    let hook = Arc::clone(&fired);
    value.on_complete(move || {
        hook.fetch_add(1, Ordering::SeqCst);
    })?;
    Ok(fired)
}

#[test]
fn untracked_fork_degenerates() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);

    let v = LaneValue::untracked(&graph, ctx, 11u32);
    let (out, phony) = fork(v)?;

    assert_eq!(*out.payload(), 11);
    assert!(!out.is_tracked());
    assert!(!phony.participates());
    assert_eq!(phony.context(), ctx);
    assert_eq!(graph.node_count(), 0, "degenerate fork allocates nothing");
    Ok(())
}

#[test]
fn fork_preserves_payload_and_reroutes_history() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(2);

    let x = LaneValue::source(&graph, ctx, 0xDEAD_BEEF_u64)?;
    let before = x.signal();
    let (y, phony) = fork(x)?;

    assert_eq!(*y.payload(), 0xDEAD_BEEF);
    assert_eq!(y.context(), ctx);
    assert!(y.is_tracked());
    assert_ne!(y.signal(), before, "history must reroute through the fork");
    assert!(phony.participates());
    assert_eq!(phony.context(), ctx);
    assert_eq!(graph.node_count(), 2);
    Ok(())
}

#[test]
fn join_preserves_payload() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);

    let x = LaneValue::source(&graph, ctx, 1u8)?;
    let (_, phony) = fork(x)?;
    let z = LaneValue::source(&graph, ctx, 42u8)?;
    let z_signal = z.signal();
    let w = join(z, &phony)?;

    assert_eq!(*w.payload(), 42);
    assert!(w.is_tracked());
    assert_ne!(w.signal(), z_signal, "history must reroute through the join");
    Ok(())
}

#[test]
fn cross_lane_ordering_join_side_first() -> Result<()> {
    let graph = ReverseGraph::new();
    let lane_a = ExecutionContext::new(0);
    let lane_b = ExecutionContext::new(1);

    let x = LaneValue::source(&graph, lane_a, 1u32)?;
    let x_fired = observe(&x)?;
    let (y, phony) = fork(x)?;
    let y_fired = observe(&y)?;

    let z = LaneValue::source(&graph, lane_b, 2u32)?;
    let z_fired = observe(&z)?;
    let w = join(z, &phony)?;
    let w_fired = observe(&w)?;

    let report = w.run_reverse()?;
    assert_eq!(report.parked, 1);
    assert_eq!(report.fired, 0);
    assert_eq!(x_fired.load(Ordering::SeqCst), 0);
    assert_eq!(z_fired.load(Ordering::SeqCst), 0, "lane B waits on lane A");
    assert_eq!(graph.waiting(), 1);

    let report = y.run_reverse()?;
    assert_eq!(report.parked, 0);
    assert_eq!(x_fired.load(Ordering::SeqCst), 1);
    assert_eq!(y_fired.load(Ordering::SeqCst), 1);
    assert_eq!(w_fired.load(Ordering::SeqCst), 1);
    assert_eq!(z_fired.load(Ordering::SeqCst), 1);
    assert_eq!(graph.waiting(), 0);

    // Re-triggering either lane must not double-fire the producer.
    let report = y.run_reverse()?;
    assert!(report.absorbed >= 1);
    let report = w.run_reverse()?;
    assert_eq!(report.fired, 0);
    assert_eq!(x_fired.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn cross_lane_ordering_fork_side_first() -> Result<()> {
    let graph = ReverseGraph::new();
    let lane_a = ExecutionContext::new(0);
    let lane_b = ExecutionContext::new(1);

    let x = LaneValue::source(&graph, lane_a, 1u32)?;
    let x_fired = observe(&x)?;
    let (y, phony) = fork(x)?;
    let z = LaneValue::source(&graph, lane_b, 2u32)?;
    let w = join(z, &phony)?;
    let w_fired = observe(&w)?;

    y.run_reverse()?;
    assert_eq!(x_fired.load(Ordering::SeqCst), 1);
    assert_eq!(w_fired.load(Ordering::SeqCst), 0);

    let report = w.run_reverse()?;
    assert_eq!(report.parked, 0, "an already-fired gate never parks the join");
    assert_eq!(w_fired.load(Ordering::SeqCst), 1);
    assert_eq!(x_fired.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn join_with_dead_phony_is_identity() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);
    let dead = graph.phony(ctx, false);

    let v = LaneValue::untracked(&graph, ctx, 5u8);
    let out = join(v, &dead)?;
    assert_eq!(*out.payload(), 5);
    assert!(!out.is_tracked());
    assert_eq!(graph.node_count(), 0);

    let tracked = LaneValue::source(&graph, ctx, 6u8)?;
    let signal = tracked.signal();
    let out = join(tracked, &dead)?;
    assert_eq!(out.signal(), signal, "nothing to gate on, value passes through");
    assert_eq!(graph.node_count(), 1);
    Ok(())
}

#[test]
fn unfired_gate_stalls_join() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);

    let anchored = graph.phony(ctx, true);
    let z = LaneValue::source(&graph, ctx, 9u16)?;
    let z_fired = observe(&z)?;
    let w = join(z, &anchored)?;
    let w_fired = observe(&w)?;

    let report = w.run_reverse()?;
    assert_eq!(report.parked, 1);
    assert_eq!(w_fired.load(Ordering::SeqCst), 0);
    assert_eq!(z_fired.load(Ordering::SeqCst), 0);

    // Drain unrelated runnable work; the join must stay parked.
    let other = LaneValue::source(&graph, ctx, 1u16)?;
    other.run_reverse()?;
    assert_eq!(w_fired.load(Ordering::SeqCst), 0);
    assert_eq!(graph.waiting(), 1);
    assert_eq!(graph.parked(), vec![w.signal().expect("join is tracked")]);
    Ok(())
}

#[test]
fn seeded_anchor_releases_parked_join() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);

    let anchored = graph.phony(ctx, true);
    let z = LaneValue::source(&graph, ctx, 9u16)?;
    let z_fired = observe(&z)?;
    let w = join(z, &anchored)?;
    let w_fired = observe(&w)?;

    w.run_reverse()?;
    assert_eq!(graph.waiting(), 1);

    let anchor = anchored.signal().expect("anchored phony carries a signal");
    let report = graph.run_from(&[anchor])?;
    assert_eq!(report.fired, 3, "anchor, join, and lane source all fire");
    assert_eq!(w_fired.load(Ordering::SeqCst), 1);
    assert_eq!(z_fired.load(Ordering::SeqCst), 1);
    assert_eq!(graph.waiting(), 0);
    Ok(())
}

#[test]
fn paused_tracking_degenerates_fork_and_join() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);

    let anchored = graph.phony(ctx, true);
    let x = LaneValue::source(&graph, ctx, 1u8)?;
    let x_signal = x.signal();
    let baseline = graph.node_count();

    {
        let _guard = tracking::pause_tracking();
        assert!(!tracking::tracking_enabled());

        let (y, phony) = fork(x)?;
        assert!(!phony.participates());
        let out = join(y, &anchored)?;
        assert_eq!(out.signal(), x_signal);
        assert_eq!(graph.node_count(), baseline);
    }

    assert!(tracking::tracking_enabled(), "guard restores tracking on drop");
    let x2 = LaneValue::source(&graph, ctx, 2u8)?;
    let (_, phony) = fork(x2)?;
    assert!(phony.participates());

    assert!(!tracking::without_tracking(tracking::tracking_enabled));
    Ok(())
}

#[test]
fn cross_graph_phony_is_rejected() -> Result<()> {
    let home = ReverseGraph::new();
    let foreign = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);

    let phony = foreign.phony(ctx, true);
    let v = LaneValue::source(&home, ctx, 1u8)?;
    let err = join(v, &phony).expect_err("cross-graph phony must be rejected");
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::GraphMismatch { .. })
    ));
    Ok(())
}

#[test]
fn self_gating_join_is_rejected() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);

    let x = LaneValue::source(&graph, ctx, 1u8)?;
    let (y, phony) = fork(x)?;
    let err = join(y, &phony).expect_err("gating a value on its own producer must fail");
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::SelfDependency)
    ));
    Ok(())
}

#[test]
fn forked_twice_completes_after_both_lanes() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);

    let x = LaneValue::source(&graph, ctx, 3u32)?;
    let x_fired = observe(&x)?;
    let (a, _phony_a) = fork(x.clone())?;
    let (b, _phony_b) = fork(x)?;

    a.run_reverse()?;
    assert_eq!(
        x_fired.load(Ordering::SeqCst),
        0,
        "producer completes only after every branched lane drains"
    );
    b.run_reverse()?;
    assert_eq!(x_fired.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn detached_values_keep_payload_and_lose_history() -> Result<()> {
    let graph = ReverseGraph::new();
    let ctx = ExecutionContext::new(0);

    let x = LaneValue::source(&graph, ctx, 9u8)?;
    let detached = x.detach();
    assert_eq!(*detached.payload(), 9);
    assert!(!detached.is_tracked());

    let err = detached
        .run_reverse()
        .expect_err("detached values have no reverse pass");
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::Detached)
    ));
    Ok(())
}
