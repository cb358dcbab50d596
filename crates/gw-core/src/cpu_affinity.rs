//! Pinning the event loop thread to a CPU core.
//!
//! The gateway multiplexes every session on one thread, so scheduler jitter
//! on that thread delays every peer at once. Wraps the `core_affinity` crate.

use tracing::{info, warn};

/// Bind the current thread to the specified CPU core.
///
/// Returns `true` if the binding succeeded, `false` if the core ID is invalid
/// or the OS rejected the request.
pub fn bind_to_core(core_id: usize) -> bool {
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();
    let Some(core) = core_ids.get(core_id) else {
        warn!("CPU core {core_id} not available (system has {} cores)", core_ids.len());
        return false;
    };

    let ok = core_affinity::set_for_current(*core);
    if ok {
        info!("event loop bound to CPU core {core_id}");
    } else {
        warn!("failed to bind event loop to CPU core {core_id}");
    }
    ok
}

/// Bind the current thread if `core_id` is `Some` and non-negative.
pub fn maybe_bind(core_id: Option<i32>) -> bool {
    match core_id {
        Some(id) if id >= 0 => bind_to_core(id as usize),
        _ => false,
    }
}
