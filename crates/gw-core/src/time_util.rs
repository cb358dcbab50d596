//! Monotonic timestamps for session activity and keep-alive deadlines.
//!
//! Stamps taken here never go backwards, even when the wall clock is stepped.

// ---------------------------------------------------------------------------
// Linux: clock_gettime
// ---------------------------------------------------------------------------

#[cfg(target_os = "linux")]
#[inline]
fn clock(id: libc::clockid_t) -> (u64, u64) {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: `ts` is a valid, writable timespec and CLOCK_MONOTONIC is
    // always supported on Linux. On failure `ts` stays zeroed.
    unsafe {
        libc::clock_gettime(id, &mut ts);
    }
    (ts.tv_sec as u64, ts.tv_nsec as u64)
}

#[cfg(target_os = "linux")]
#[inline]
fn clock_monotonic() -> (u64, u64) {
    clock(libc::CLOCK_MONOTONIC)
}

// ---------------------------------------------------------------------------
// Non-Linux: Instant fallback
// ---------------------------------------------------------------------------

#[cfg(not(target_os = "linux"))]
#[inline]
fn clock_monotonic() -> (u64, u64) {
    use std::{sync::LazyLock, time::Instant};
    static ORIGIN: LazyLock<Instant> = LazyLock::new(Instant::now);
    let d = ORIGIN.elapsed();
    (d.as_secs(), d.subsec_nanos() as u64)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Monotonic clock in **microseconds**.
#[inline]
pub fn monotonic_us() -> u64 {
    let (sec, nsec) = clock_monotonic();
    sec * 1_000_000 + nsec / 1_000
}
