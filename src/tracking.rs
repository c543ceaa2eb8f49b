//! Thread-local control over reverse-pass participation.
//!
//! [`fork`](crate::dependency::fork) and [`join`](crate::dependency::join)
//! consult [`tracking_enabled`] and degenerate to passthrough values while
//! tracking is paused, so callers can build dead forward paths without
//! allocating graph nodes. The `LANELINK_UNTRACKED` environment variable
//! disables tracking process-wide.

use std::cell::Cell;

thread_local! {
    static PAUSE_DEPTH: Cell<u32> = Cell::new(0);
}

/// RAII guard that resumes reverse-pass tracking when dropped.
///
/// Created by [`pause_tracking`] and [`without_tracking`]. Guards nest; the
/// pause counter is unwound even if the guarded scope panics.
pub struct TrackingGuard {
    active: bool,
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        if self.active {
            PAUSE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
            self.active = false;
        }
    }
}

/// Pauses reverse-pass tracking on the current thread until the guard drops.
pub fn pause_tracking() -> TrackingGuard {
    PAUSE_DEPTH.with(|depth| depth.set(depth.get() + 1));
    TrackingGuard { active: true }
}

/// Runs `f` with reverse-pass tracking paused.
pub fn without_tracking<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let guard = pause_tracking();
    let result = f();
    drop(guard);
    result
}

/// Returns `true` when fork/join should record reverse-pass nodes.
pub fn tracking_enabled() -> bool {
    if crate::env::untracked() {
        return false;
    }
    PAUSE_DEPTH.with(|depth| depth.get() == 0)
}
