//! Empirically tuned timing constants.
//!
//! These values were calibrated against real display hardware; they are
//! named here so call sites read sensibly, but their defaults are part of
//! the hardware contract and must not be changed casually.

use std::time::Duration;

/// How long a beamposition query keeps retrying when the hardware returns
/// a (possibly spurious) zero before the zero is accepted as genuine.
pub const BEAM_ZERO_RETRY_WINDOW: Duration = Duration::from_millis(100);

/// Settle time after disabling a display pipeline before its stopped state
/// is confirmed by polling (per-head strategy).
pub const PIPELINE_REST_DELAY: Duration = Duration::from_millis(50);

/// Blocking wait between stopping all heads and restarting them. Long on
/// purpose: in-flight scanout must fully drain and the hardware must settle
/// at its rest position.
pub const SYNC_SETTLE_SLEEP: Duration = Duration::from_secs(1);

/// Pause between synchronization attempts in the retry loop.
pub const SYNC_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Wait for double-buffered LUT registers to latch an uploaded gamma table
/// (the visible effect can be deferred to the next vblank).
pub const LUT_LATCH_DELAY: Duration = Duration::from_millis(100);

/// Scanline threshold used to detect the start of a fresh refresh cycle:
/// safely past scanline 0, safely before wraparound for any plausible video
/// mode of at least 640x480.
pub const FRESH_CYCLE_SCANLINE: u32 = 240;

/// Bail-out guard for the synchronizer's busy-poll phases, so wedged
/// hardware (or a stopped CRTC misreported as running) cannot hang the
/// caller forever. Generous compared to any real frame duration.
pub const SYNC_POLL_GUARD: Duration = Duration::from_millis(500);

/// Beampositions beyond this are implausible for any real video mode and
/// indicate a powered-down GPU was queried (hybrid-graphics systems).
pub const IMPLAUSIBLE_BEAM_POSITION: u32 = 16384;
