//! Logical screen to physical CRTC mapping.
//!
//! Higher layers address displays by logical screen id plus an output rank
//! (0 = primary output of that screen). Hardware wants a physical head /
//! CRTC index. The association starts out as the identity, can be seeded
//! from the environment, refined once by a gamma-probe heuristic, and
//! finally pinned by an explicit user override, strictly in that order,
//! monotonically more specific, never reverting within a session.

use std::time::Duration;

use scanout_mmio::Aperture;

use crate::context::DisplayContext;
use crate::lut::LutState;
use crate::timing::LUT_LATCH_DELAY;
use crate::{GpuError, NO_OUTPUT};

/// Maximum number of logical screens tracked.
pub const MAX_SCREENS: usize = 16;
/// Maximum outputs (ranks) per logical screen.
pub const MAX_OUTPUTS_PER_SCREEN: usize = 8;

/// The mapping table. All process-wide; owned by [`DisplayContext`].
#[derive(Debug, Clone)]
pub struct ScreenMapping {
    /// Physical head per (screen, rank); [`NO_OUTPUT`] = no more outputs.
    heads: [[i32; MAX_OUTPUTS_PER_SCREEN]; MAX_SCREENS],
    /// Low-level CRTC index per (screen, rank).
    crtcs: [[i32; MAX_OUTPUTS_PER_SCREEN]; MAX_SCREENS],
    /// Once set, auto-detection is a no-op for the rest of the session.
    user_override: bool,
    /// Latch: the heuristic runs at most once per session.
    autodetect_done: bool,
}

impl Default for ScreenMapping {
    fn default() -> Self {
        Self::identity()
    }
}

impl ScreenMapping {
    /// Identity default: screen N drives head/CRTC N at rank 0.
    pub fn identity() -> Self {
        let mut heads = [[NO_OUTPUT; MAX_OUTPUTS_PER_SCREEN]; MAX_SCREENS];
        let mut crtcs = [[NO_OUTPUT; MAX_OUTPUTS_PER_SCREEN]; MAX_SCREENS];
        for (screen, (h, c)) in heads.iter_mut().zip(crtcs.iter_mut()).enumerate() {
            h[0] = screen as i32;
            c[0] = screen as i32;
        }
        Self {
            heads,
            crtcs,
            user_override: false,
            autodetect_done: false,
        }
    }

    /// Seeds the mapping from the environment digit string. Unlike an
    /// explicit user override, this does not latch out auto-detection.
    pub fn seed_from_digits(&mut self, digits: &[usize]) {
        for (screen, &crtc) in digits.iter().take(MAX_SCREENS).enumerate() {
            self.heads[screen][0] = crtc as i32;
            self.crtcs[screen][0] = crtc as i32;
        }
    }

    pub fn head_for(&self, screen: usize, rank: usize) -> i32 {
        if screen >= MAX_SCREENS || rank >= MAX_OUTPUTS_PER_SCREEN {
            return NO_OUTPUT;
        }
        self.heads[screen][rank]
    }

    pub fn crtc_for(&self, screen: usize, rank: usize) -> i32 {
        if screen >= MAX_SCREENS || rank >= MAX_OUTPUTS_PER_SCREEN {
            return NO_OUTPUT;
        }
        self.crtcs[screen][rank]
    }

    /// Explicit override. Latches out auto-detection for the rest of the
    /// session; nothing resets the latch short of a process restart.
    pub fn set_head_for(&mut self, screen: usize, rank: usize, head: i32) {
        if screen < MAX_SCREENS && rank < MAX_OUTPUTS_PER_SCREEN {
            self.heads[screen][rank] = head;
            self.user_override = true;
        }
    }

    pub fn set_crtc_for(&mut self, screen: usize, rank: usize, crtc: i32) {
        if screen < MAX_SCREENS && rank < MAX_OUTPUTS_PER_SCREEN {
            self.crtcs[screen][rank] = crtc;
            self.user_override = true;
        }
    }

    pub fn user_overridden(&self) -> bool {
        self.user_override
    }

    pub fn autodetect_done(&self) -> bool {
        self.autodetect_done
    }

    fn record_autodetect(&mut self, screen: usize, rank: usize, crtc: i32) {
        self.heads[screen][rank] = crtc;
        self.crtcs[screen][rank] = crtc;
    }
}

/// Seam to the windowing system's per-output gamma API.
///
/// The probe heuristic needs to push a gamma table through the OS-visible
/// output (the thing a logical screen actually names) and then look for the
/// effect at the CRTC register level. Window-system glue is outside this
/// crate, so the context takes it as a trait object.
pub trait OutputGammaChannel {
    /// Current 256-slot gamma table of (screen, rank), or `None` when the
    /// output does not exist.
    fn read_gamma(&mut self, screen: usize, rank: usize) -> Option<Vec<(u16, u16, u16)>>;

    /// Uploads a 256-slot gamma table. Returns false when the output
    /// rejected it.
    fn set_gamma(&mut self, screen: usize, rank: usize, table: &[(u16, u16, u16)]) -> bool;
}

impl<A: Aperture> DisplayContext<A> {
    /// Heuristic screen-to-head auto-detection.
    ///
    /// For each (screen, rank) output the gamma channel knows: remember its
    /// current gamma table, upload an all-zero table, give the
    /// double-buffered LUT registers one latch interval to take effect,
    /// then scan every physical CRTC for the one whose hardware LUT now
    /// classifies as all-zero, and record that CRTC as the mapping. The
    /// original table is restored (plus another latch interval) before the
    /// next output is probed.
    ///
    /// Mutates hardware state transiently; must not run while any window
    /// is rendering. Idempotent: a successful run latches, and an explicit
    /// user override disables the heuristic permanently.
    pub fn autodetect_screen_mappings(
        &self,
        channel: &mut dyn OutputGammaChannel,
        max_heads: usize,
    ) -> Result<(), GpuError> {
        {
            let mapping = self.mapping_lock();
            if mapping.user_overridden() || mapping.autodetect_done() {
                tracing::debug!(
                    user_override = mapping.user_overridden(),
                    "screen mapping auto-detection skipped (latched)"
                );
                return Ok(());
            }
        }

        let heads = self.active_descriptor()?.head_count.min(max_heads);
        let zero_table = vec![(0u16, 0u16, 0u16); 256];

        for screen in 0..MAX_SCREENS {
            for rank in 0..MAX_OUTPUTS_PER_SCREEN {
                let Some(saved) = channel.read_gamma(screen, rank) else {
                    break; // no more outputs on this screen
                };
                if !channel.set_gamma(screen, rank, &zero_table) {
                    continue;
                }
                sleep_outside_locks(LUT_LATCH_DELAY);

                let mut found = NO_OUTPUT;
                for head in 0..heads {
                    if matches!(self.lut_state(head, false), Ok(LutState::AllZero)) {
                        found = head as i32;
                        break;
                    }
                }
                if found != NO_OUTPUT {
                    tracing::debug!(screen, rank, crtc = found, "auto-detected output mapping");
                    self.mapping_lock().record_autodetect(screen, rank, found);
                } else {
                    tracing::warn!(screen, rank, "no CRTC latched the zero-LUT probe");
                }

                channel.set_gamma(screen, rank, &saved);
                sleep_outside_locks(LUT_LATCH_DELAY);
            }
        }

        self.mapping_lock().autodetect_done = true;
        Ok(())
    }
}

fn sleep_outside_locks(d: Duration) {
    std::thread::sleep(d);
}
