//! Display-head synchronization.
//!
//! Phase-aligns the vertical refresh cycles of multiple heads on one GPU by
//! stopping each head at a known scanline position and restarting them all
//! on (as close as possible to) the same clock edge. Two strategies exist,
//! keyed on the display-engine generation:
//!
//! - **Shared master enable** (AVIVO, up to 2 heads): all enable bits live
//!   in one register, so the restart is a single register write and the
//!   hardware latches every head simultaneously. This is the linchpin of
//!   the strategy's correctness and must never be split into per-bit
//!   writes.
//! - **Per-head enable** (DCE-4+, up to 6 heads): each head has its own
//!   enable bit and a run-state readback. Heads are stopped and confirmed
//!   one at a time; the restart is a tight loop of pre-computed writes with
//!   nothing between them, because every microsecond of inter-write skew
//!   shows up as residual.
//!
//! The whole stop → settle → restart cycle blocks the calling thread for
//! over a second per attempt and may be retried until a caller-supplied
//! deadline. Callers must treat this as a foreground, multi-second
//! operation.

use std::thread::sleep;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use scanout_mmio::Aperture;
use scanout_regs::Vendor;

use crate::beam::raw_beam_position;
use crate::context::{DisplayContext, GpuInstance};
use crate::error::GpuError;
use crate::timing::{
    FRESH_CYCLE_SCANLINE, SYNC_POLL_GUARD, SYNC_RETRY_DELAY, SYNC_SETTLE_SLEEP,
};

bitflags! {
    /// Head-enable bits of the AVIVO shared master-enable register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CrtcEnable: u32 {
        const CRTC1 = 1 << 0;
        const CRTC2 = 1 << 1;
    }
}

/// Strategy selection for [`DisplayContext::synchronize_heads`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMethod {
    /// Pick by display-engine generation.
    #[default]
    Auto,
    /// Force the shared-master-enable strategy.
    MasterEnable,
    /// Force the per-head strategy.
    PerHead,
}

/// Result of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Residual scanline offset between heads after the final attempt.
    /// 0 is ideal; small values are hardware clock jitter. The per-head
    /// strategy cannot measure a meaningful residual for more than two
    /// heads and reports 0 optimistically.
    pub residual: i64,
    pub attempts: u32,
    /// False when the deadline elapsed before the residual target was met.
    pub within_target: bool,
}

impl<A: Aperture> DisplayContext<A> {
    /// Phase-aligns the refresh cycles of the heads driving `screens`.
    ///
    /// Retries the full stop/settle/restart cycle until the measured
    /// residual is within `allowed_residual` scanlines or `timeout`
    /// elapses, sleeping between attempts. Only implemented for AMD
    /// display engines; anything else fails fast with no hardware side
    /// effects.
    pub fn synchronize_heads(
        &self,
        screens: &[usize],
        method: SyncMethod,
        timeout: Duration,
        allowed_residual: u32,
    ) -> Result<SyncOutcome, GpuError> {
        let gpu = self.active_gpu()?;
        if gpu.descriptor.vendor != Vendor::Amd {
            return Err(GpuError::Unsupported);
        }
        let Some(gen) = gpu.descriptor.amd_gen() else {
            return Err(GpuError::Unsupported);
        };

        let mut heads: Vec<usize> = Vec::new();
        for &screen in screens {
            let head = self.resolve_screen(screen)?;
            if !heads.contains(&head) {
                heads.push(head);
            }
        }
        if heads.is_empty() {
            return Err(GpuError::NoAdapter);
        }

        let per_head = match method {
            SyncMethod::Auto => gen.has_evergreen_display_block(),
            SyncMethod::MasterEnable => false,
            SyncMethod::PerHead => true,
        };

        let start = Instant::now();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let residual = if per_head {
                sync_per_head(gpu, &heads)
            } else {
                sync_master_enable(gpu, &heads)
            };

            if residual.unsigned_abs() <= u64::from(allowed_residual) {
                tracing::debug!(attempts, residual, "head synchronization converged");
                return Ok(SyncOutcome {
                    residual,
                    attempts,
                    within_target: true,
                });
            }
            if start.elapsed() >= timeout {
                tracing::warn!(
                    attempts,
                    residual,
                    allowed_residual,
                    "head synchronization deadline elapsed above residual target"
                );
                return Ok(SyncOutcome {
                    residual,
                    attempts,
                    within_target: false,
                });
            }
            sleep(SYNC_RETRY_DELAY);
        }
    }
}

/// Busy-polls until the head's beamposition satisfies `pred`, bailing out
/// after [`SYNC_POLL_GUARD`] so dead hardware cannot hang the caller.
fn poll_beam<A: Aperture>(
    gpu: &GpuInstance<A>,
    head: usize,
    pred: impl Fn(u32) -> bool,
) {
    let deadline = Instant::now() + SYNC_POLL_GUARD;
    while Instant::now() < deadline {
        match raw_beam_position(gpu, head) {
            Some(pos) if pred(pos) => return,
            Some(_) => continue,
            None => return,
        }
    }
}

/// Shared-master-enable strategy (AVIVO).
fn sync_master_enable<A: Aperture>(gpu: &GpuInstance<A>, heads: &[usize]) -> i64 {
    use scanout_regs::amd::avivo;

    let original = CrtcEnable::from_bits_truncate(gpu.read(avivo::DC_CRTC_MASTER_EN));

    for &head in heads {
        // Heads beyond the register's two enable bits cannot be driven by
        // this strategy; truncation would leave an empty bit set that every
        // mask trivially contains.
        let bit = CrtcEnable::from_bits_truncate(1 << head);
        if bit.is_empty() || !original.contains(bit) {
            continue;
        }
        // Detect the start of a fresh refresh cycle without relying on
        // absolute frame boundaries (which differ per head until they are
        // synchronized): wait until the beam passes the threshold, then
        // until it wraps back below it.
        poll_beam(gpu, head, |pos| pos > FRESH_CYCLE_SCANLINE);
        poll_beam(gpu, head, |pos| pos < FRESH_CYCLE_SCANLINE);
        // Stop just this head at its rest position. One locked
        // read-modify-write, so a concurrent observer never sees a torn
        // intermediate mask.
        gpu.update(avivo::DC_CRTC_MASTER_EN, bit.bits(), 0);
    }

    // Let in-flight scanout drain completely and the hardware settle.
    sleep(SYNC_SETTLE_SLEEP);

    // The restart: ONE write of the original mask. The hardware latches
    // all enable bits on the same clock edge, which is what actually
    // synchronizes the heads.
    gpu.write(avivo::DC_CRTC_MASTER_EN, original.bits());

    if heads.len() >= 2 {
        let a = raw_beam_position(gpu, heads[0]).unwrap_or(0) as i64;
        let b = raw_beam_position(gpu, heads[1]).unwrap_or(0) as i64;
        a - b
    } else {
        0
    }
}

/// Per-head strategy (DCE-4 and later).
fn sync_per_head<A: Aperture>(gpu: &GpuInstance<A>, heads: &[usize]) -> i64 {
    use scanout_regs::amd::evergreen as ev;

    // Snapshot each head's control word; the restore loop below replays
    // these verbatim so it never needs a read between writes.
    let mut restore: Vec<(u32, u32)> = Vec::with_capacity(heads.len());
    for &head in heads {
        let control_reg = ev::CRTC_CONTROL + ev::CRTC_REGISTER_OFFSETS[head];
        let control = gpu.read(control_reg);
        if control & ev::CRTC_MASTER_EN == 0 {
            continue;
        }
        restore.push((control_reg, control));
    }

    // Stop heads strictly one at a time, each fully confirmed before the
    // next: every head's register block sits at a different offset and a
    // serial confirm-poll is the safe order.
    for &(control_reg, _) in &restore {
        gpu.update(control_reg, ev::CRTC_MASTER_EN, 0);
        // Give the pipeline time to reach its defined rest position, then
        // confirm the hardware really stopped (not merely accepted the
        // write).
        sleep(crate::timing::PIPELINE_REST_DELAY);
        let deadline = Instant::now() + SYNC_POLL_GUARD;
        while Instant::now() < deadline {
            if gpu.read(control_reg) & ev::CRTC_MASTER_EN_STATE == 0 {
                break;
            }
        }
    }

    sleep(SYNC_SETTLE_SLEEP);

    // Restart: nothing but writes in this loop. Every microsecond of
    // inter-write latency becomes enable skew between heads.
    for &(control_reg, control) in &restore {
        gpu.write(control_reg, control);
    }

    // No meaningful pairwise residual exists for this many heads.
    0
}
