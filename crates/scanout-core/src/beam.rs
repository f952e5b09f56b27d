//! Beamposition and vblank timing queries.
//!
//! The raw hardware scanline readout is normalized into the "scanline 0 =
//! start of active video" convention in up to three steps:
//! 1. Per-generation register decode (mask the vertical field out of the
//!    status/position register).
//! 2. On AMD, subtraction of the vblank-interval end offset, modulo the
//!    frame's total scanline count, because vblank neither starts at the active
//!    video boundary nor ends at frame total, so the raw counter is phase
//!    shifted against the convention.
//! 3. An optional per-screen corrective bias for GPU/driver combinations
//!    known to report offset readings (most NVIDIA parts), again modulo
//!    the mode's total scanline count.

use std::time::Instant;

use scanout_mmio::Aperture;
use scanout_regs::{intel, nvidia, Vendor};

use crate::context::{DisplayContext, GpuInstance};
use crate::descriptor::Generation;
use crate::error::GpuError;
use crate::mapping::MAX_SCREENS;
use crate::timing::{BEAM_ZERO_RETRY_WINDOW, IMPLAUSIBLE_BEAM_POSITION};

/// Per-screen corrective offset for the raw hardware readout. Neutral
/// (0, 0) unless calibrated at window-open time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeamCorrection {
    pub bias: i32,
    /// Total scanline count of the current video mode; 0 = unknown (bias
    /// wrap disabled).
    pub vtotal: i32,
}

/// Beamposition bookkeeping, per logical screen.
#[derive(Debug, Clone)]
pub(crate) struct BeamTable {
    pub corrections: [BeamCorrection; MAX_SCREENS],
    /// Latched failure state: once a screen's queries prove unhealthy they
    /// are never retried (each retry would stall the caller for the full
    /// retry window).
    pub unhealthy: [bool; MAX_SCREENS],
    /// One-time diagnostic flag per screen.
    warned: [bool; MAX_SCREENS],
}

impl Default for BeamTable {
    fn default() -> Self {
        Self {
            corrections: [BeamCorrection::default(); MAX_SCREENS],
            unhealthy: [false; MAX_SCREENS],
            warned: [false; MAX_SCREENS],
        }
    }
}

/// `(raw - end) mod vtotal`, landing in `[0, vtotal)`.
fn wrap_scanline(raw: i64, end: i64, vtotal: i64) -> u32 {
    if vtotal <= 0 {
        return raw.max(0) as u32;
    }
    (raw - end).rem_euclid(vtotal) as u32
}

/// Hardware-level decode for one head, without bias/retry policy. Returns
/// `None` when this GPU cannot report a beamposition at all.
pub(crate) fn raw_beam_position<A: Aperture>(gpu: &GpuInstance<A>, head: usize) -> Option<u32> {
    match gpu.descriptor.generation {
        Generation::Amd(gen) if gen.has_evergreen_display_block() => {
            use scanout_regs::amd::evergreen as ev;
            let off = ev::CRTC_REGISTER_OFFSETS[head];
            let raw = gpu.read(ev::CRTC_STATUS_POSITION + off) & ev::VBEAM_POSITION_MASK;
            let blank = gpu.read(ev::CRTC_V_BLANK_START_END + off);
            let vblank_end = (blank >> 16) & 0x1FFF;
            // V_TOTAL holds the line count minus one.
            let vtotal = (gpu.read(ev::CRTC_V_TOTAL + off) & 0x1FFF) + 1;
            Some(wrap_scanline(raw as i64, vblank_end as i64, vtotal as i64))
        }
        Generation::Amd(_) => {
            use scanout_regs::amd::avivo;
            let off = head as u32 * avivo::CRTC_BLOCK_STRIDE;
            let raw =
                gpu.read(avivo::D1CRTC_STATUS_POSITION + off) & avivo::VBEAM_POSITION_MASK;
            let blank = gpu.read(avivo::D1CRTC_V_BLANK_START_END + off);
            let vblank_end = (blank >> 16) & 0x1FFF;
            let vtotal = (gpu.read(avivo::D1CRTC_V_TOTAL + off) & 0x1FFF) + 1;
            Some(wrap_scanline(raw as i64, vblank_end as i64, vtotal as i64))
        }
        Generation::Nvidia(id) => {
            let offset = nvidia::raster_position_offset(id, head);
            Some(gpu.read(offset) & nvidia::RASTER_POSITION_MASK)
        }
        Generation::Intel => Some(gpu.read(intel::dsl_offset(head)) & intel::DSL_MASK),
        Generation::Unknown => None,
    }
}

impl<A: Aperture> DisplayContext<A> {
    /// Sets the per-screen beamposition correction, normally from a
    /// calibration pass at window-open time.
    pub fn set_beam_correction(&self, screen: usize, bias: i32, vtotal: i32) {
        if screen < MAX_SCREENS {
            let mut beam = self.beam.lock().unwrap_or_else(|e| e.into_inner());
            beam.corrections[screen] = BeamCorrection { bias, vtotal };
        }
    }

    pub fn beam_correction(&self, screen: usize) -> BeamCorrection {
        let beam = self.beam.lock().unwrap_or_else(|e| e.into_inner());
        beam.corrections.get(screen).copied().unwrap_or_default()
    }

    /// Current vertical scanout position for a logical screen, or -1 when
    /// beamposition queries are unsupported or latched unhealthy.
    pub fn beam_position(&self, screen: usize) -> i32 {
        if screen >= MAX_SCREENS {
            tracing::error!(screen, "screen index out of range");
            return -1;
        }
        {
            let beam = self.beam.lock().unwrap_or_else(|e| e.into_inner());
            if beam.unhealthy[screen] {
                return -1;
            }
        }

        let Ok(head) = self.resolve_screen(screen) else {
            return -1;
        };
        let Ok(gpu) = self.active_gpu() else {
            return -1;
        };
        let Some(mut pos) = raw_beam_position(gpu, head) else {
            return -1;
        };

        // Implausibly large readouts on a dual-GPU system mean the active
        // selection is wrong (the queried discrete GPU is powered down).
        // Switch once per session and retry, unless the user pinned the
        // selection.
        if pos > IMPLAUSIBLE_BEAM_POSITION
            && self.gpu_count() == 2
            && gpu.descriptor.vendor != Vendor::Intel
            && !self.active_is_pinned()
            && !self
                .heuristic_switched
                .swap(true, std::sync::atomic::Ordering::AcqRel)
        {
            let other = 1 - self.active_index();
            tracing::warn!(
                position = pos,
                from = self.active_index(),
                to = other,
                "implausible beamposition, switching active GPU"
            );
            self.switch_active(other);
            return self.beam_position(screen);
        }
        if pos > IMPLAUSIBLE_BEAM_POSITION {
            return -1;
        }

        // Some hardware transiently reads zero. Keep sampling inside the
        // retry window before trusting it; if it never recovers, latch the
        // screen unhealthy so callers are not stalled 100 ms per query
        // forever.
        if pos == 0 && gpu.descriptor.retry_zero_beam {
            let deadline = Instant::now() + BEAM_ZERO_RETRY_WINDOW;
            while pos == 0 && Instant::now() < deadline {
                pos = match raw_beam_position(gpu, head) {
                    Some(p) => p,
                    None => return -1,
                };
            }
            if pos == 0 {
                let mut beam = self.beam.lock().unwrap_or_else(|e| e.into_inner());
                beam.unhealthy[screen] = true;
                if !beam.warned[screen] {
                    beam.warned[screen] = true;
                    tracing::warn!(
                        screen,
                        head,
                        "beamposition stuck at zero for the whole retry window; \
                         queries disabled for this screen. The screen-to-CRTC \
                         mapping may be wrong for this GPU/output combination."
                    );
                }
                return -1;
            }
        }

        let correction = self.beam_correction(screen);
        let mut corrected = pos as i64 - correction.bias as i64;
        if corrected < 0 && correction.vtotal > 0 {
            corrected = corrected.rem_euclid(correction.vtotal as i64);
        }
        corrected.max(0) as i32
    }

    /// Whether the screen's CRTC is currently inside its vertical blank
    /// interval. AMD only; other vendors report `Unsupported`.
    pub fn in_vblank(&self, screen: usize) -> Result<bool, GpuError> {
        let head = self.resolve_screen(screen)?;
        let gpu = self.active_gpu()?;
        match gpu.descriptor.generation {
            Generation::Amd(gen) if gen.has_evergreen_display_block() => {
                use scanout_regs::amd::evergreen as ev;
                let off = ev::CRTC_REGISTER_OFFSETS[head];
                Ok(gpu.read(ev::CRTC_STATUS + off) & ev::CRTC_V_BLANK != 0)
            }
            Generation::Amd(_) => {
                use scanout_regs::amd::avivo;
                let off = head as u32 * avivo::CRTC_BLOCK_STRIDE;
                Ok(gpu.read(avivo::D1CRTC_STATUS + off) & 0x1 != 0)
            }
            _ => Err(GpuError::Unsupported),
        }
    }
}
