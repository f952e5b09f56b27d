//! Hardware gamma LUT classification/setup and dither control.
//!
//! The LUT is 256 slots of 30-bit packed RGB (10 bits per channel, top two
//! bits of each 32-bit readback undefined). The data port auto-increments
//! the read/write index, so a scan is: reset the index, then hit the data
//! port 256 times.
//!
//! Classification deliberately runs the full 256-slot scan even after both
//! candidate classifications are ruled out, because debug mode logs every
//! slot and short-circuiting would hide the interesting ones.

use scanout_mmio::Aperture;
use scanout_regs::amd::{identity_lut_slot, LUT_SLOT_COUNT, LUT_SLOT_MASK};
use scanout_regs::AmdGen;

use crate::context::{DisplayContext, GpuInstance};
use crate::error::GpuError;

/// Neutral value of the three black-offset registers.
pub const NEUTRAL_BLACK_OFFSET: u32 = 0x0000;
/// Neutral value of the three white-offset registers.
pub const NEUTRAL_WHITE_OFFSET: u32 = 0xFFFF;

/// Classification of a head's hardware LUT state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LutState {
    /// A regular (arbitrary) gamma table.
    Arbitrary,
    /// Every slot reads zero.
    AllZero,
    /// A mathematically perfect identity ramp with neutral black/white
    /// offsets: true passthrough.
    Identity,
    /// Identity ramp, but the black/white offset registers carry a
    /// non-neutral bias.
    IdentityWithOffsets,
}

impl LutState {
    /// Wire code used over the command surface.
    pub fn code(self) -> u32 {
        match self {
            LutState::Arbitrary => 0,
            LutState::AllZero => 1,
            LutState::Identity => 2,
            LutState::IdentityWithOffsets => 3,
        }
    }
}

/// Per-head register addresses of one LUT block, resolved per generation.
struct LutBlock {
    rw_mode: u32,
    rw_index: u32,
    data: u32,
    write_en_mask: Option<u32>,
    black: [u32; 3],
    white: [u32; 3],
    /// AVIVO multiplexes one data port over both palettes; the select
    /// register picks which.
    rw_select: Option<(u32, u32)>,
}

fn lut_block(gen: AmdGen, head: usize) -> LutBlock {
    if gen.has_evergreen_display_block() {
        use scanout_regs::amd::evergreen as ev;
        let off = ev::CRTC_REGISTER_OFFSETS[head];
        LutBlock {
            rw_mode: ev::DC_LUT_RW_MODE + off,
            rw_index: ev::DC_LUT_RW_INDEX + off,
            data: ev::DC_LUT_30_COLOR + off,
            write_en_mask: Some(ev::DC_LUT_WRITE_EN_MASK + off),
            black: [
                ev::DC_LUT_BLACK_OFFSET_RED + off,
                ev::DC_LUT_BLACK_OFFSET_GREEN + off,
                ev::DC_LUT_BLACK_OFFSET_BLUE + off,
            ],
            white: [
                ev::DC_LUT_WHITE_OFFSET_RED + off,
                ev::DC_LUT_WHITE_OFFSET_GREEN + off,
                ev::DC_LUT_WHITE_OFFSET_BLUE + off,
            ],
            rw_select: None,
        }
    } else {
        use scanout_regs::amd::avivo;
        let pal = head as u32 * avivo::LUT_BLOCK_STRIDE;
        LutBlock {
            rw_mode: avivo::DC_LUT_RW_MODE,
            rw_index: avivo::DC_LUT_RW_INDEX,
            data: avivo::DC_LUT_30_COLOR,
            write_en_mask: Some(avivo::DC_LUT_WRITE_EN_MASK),
            black: [
                avivo::DC_LUTA_BLACK_OFFSET_RED + pal,
                avivo::DC_LUTA_BLACK_OFFSET_GREEN + pal,
                avivo::DC_LUTA_BLACK_OFFSET_BLUE + pal,
            ],
            white: [
                avivo::DC_LUTA_WHITE_OFFSET_RED + pal,
                avivo::DC_LUTA_WHITE_OFFSET_GREEN + pal,
                avivo::DC_LUTA_WHITE_OFFSET_BLUE + pal,
            ],
            rw_select: Some((avivo::DC_LUT_RW_SELECT, head as u32)),
        }
    }
}

impl<A: Aperture> DisplayContext<A> {
    /// Classifies the hardware LUT of `head`. `debug` additionally logs
    /// every slot readback.
    pub fn lut_state(&self, head: usize, debug: bool) -> Result<LutState, GpuError> {
        let head = self.validate_head(head)?;
        let gpu = self.active_gpu()?;
        let Some(gen) = gpu.descriptor.amd_gen() else {
            return Err(GpuError::Unsupported);
        };
        let block = lut_block(gen, head);

        if let Some((select, value)) = block.rw_select {
            gpu.write(select, value);
        }
        gpu.write(block.rw_mode, 0);
        gpu.write(block.rw_index, 0);

        let mut all_zero = true;
        let mut all_identity = true;
        for i in 0..LUT_SLOT_COUNT {
            // The data port auto-increments the index after each read.
            let slot = gpu.read(block.data) & LUT_SLOT_MASK;
            if debug {
                tracing::debug!(slot = i, value = format_args!("0x{slot:08x}"), "LUT slot");
            }
            all_zero &= slot == 0;
            all_identity &= slot == identity_lut_slot(i);
        }

        let mut neutral = true;
        for reg in block.black {
            neutral &= gpu.read(reg) == NEUTRAL_BLACK_OFFSET;
        }
        for reg in block.white {
            neutral &= gpu.read(reg) == NEUTRAL_WHITE_OFFSET;
        }

        Ok(if all_zero {
            LutState::AllZero
        } else if all_identity && neutral {
            LutState::Identity
        } else if all_identity {
            LutState::IdentityWithOffsets
        } else {
            LutState::Arbitrary
        })
    }

    /// Writes a perfect identity ramp into all 256 LUT slots and neutral
    /// black/white offsets. From the DCE-4.1 APUs onward also forces the
    /// auxiliary color-pipeline stages (input gamma, prescale, degamma,
    /// gamut remap, regamma, output CSC) into bypass: an identity LUT is
    /// not a passthrough if any of those still applies a transform.
    pub fn load_identity_lut(&self, head: usize) -> Result<(), GpuError> {
        let head = self.validate_head(head)?;
        let gpu = self.active_gpu()?;
        let Some(gen) = gpu.descriptor.amd_gen() else {
            return Err(GpuError::Unsupported);
        };
        let block = lut_block(gen, head);

        if let Some((select, value)) = block.rw_select {
            gpu.write(select, value);
        }
        gpu.write(block.rw_mode, 0);
        if let Some(mask) = block.write_en_mask {
            gpu.write(mask, 0x0000_003F);
        }
        gpu.write(block.rw_index, 0);
        for i in 0..LUT_SLOT_COUNT {
            gpu.write(block.data, identity_lut_slot(i));
        }
        for reg in block.black {
            gpu.write(reg, NEUTRAL_BLACK_OFFSET);
        }
        for reg in block.white {
            gpu.write(reg, NEUTRAL_WHITE_OFFSET);
        }

        if gen.at_least(AmdGen::Dce41) {
            use scanout_regs::amd::evergreen as ev;
            let off = ev::CRTC_REGISTER_OFFSETS[head];
            gpu.write(ev::INPUT_GAMMA_CONTROL + off, ev::INPUT_GAMMA_USE_LUT);
            gpu.write(ev::PRESCALE_GRPH_CONTROL + off, ev::GRPH_PRESCALE_BYPASS);
            gpu.write(ev::PRESCALE_OVL_CONTROL + off, ev::OVL_PRESCALE_BYPASS);
            gpu.write(ev::INPUT_CSC_CONTROL + off, 0);
            gpu.write(ev::DEGAMMA_CONTROL + off, 0);
            gpu.write(ev::GAMUT_REMAP_CONTROL + off, 0);
            gpu.write(ev::REGAMMA_CONTROL + off, 0);
            gpu.write(ev::OUTPUT_CSC_CONTROL + off, 0);
        }

        tracing::debug!(head, "identity LUT loaded");
        Ok(())
    }

    /// Enables or disables digital-output dithering for a head.
    ///
    /// `value == 0` disables: the current register value is cached so a
    /// later re-enable restores the exact prior setting. A non-zero value
    /// re-enables from the cache when one exists; otherwise the caller's
    /// raw value is written as-is (best effort: we never observed this
    /// head's original setting, so all we can do is cross fingers).
    pub fn set_dither_mode(&self, head: usize, value: u32) -> Result<(), GpuError> {
        let head = self.validate_head(head)?;
        let gpu = self.active_gpu()?;
        let Some(gen) = gpu.descriptor.amd_gen() else {
            tracing::debug!(vendor = %gpu.descriptor.vendor, "dither control unsupported");
            return Err(GpuError::Unsupported);
        };

        let Some(reg) = dither_register(gpu, gen, head) else {
            // No digital encoder drives this head: analog VGA, nothing to
            // dither.
            tracing::debug!(head, "no active digital encoder, dither request ignored");
            return Ok(());
        };

        let mut cache = gpu.dither_cache.lock().unwrap_or_else(|e| e.into_inner());
        if value == 0 {
            let current = gpu.read(reg);
            if cache[head].is_none() {
                cache[head] = Some(current);
            }
            tracing::debug!(head, cached = current, "dithering disabled");
            gpu.write(reg, 0);
        } else if let Some(previous) = cache[head] {
            tracing::debug!(head, restored = previous, "dithering restored");
            gpu.write(reg, previous);
        } else {
            tracing::debug!(
                head,
                value,
                "no cached dither state, writing caller value as-is (cross fingers)"
            );
            gpu.write(reg, value);
        }
        Ok(())
    }
}

/// Finds the dither-control register for a head.
///
/// DCE-4+ has a per-CRTC FMT block. AVIVO has no static CRTC-to-encoder
/// correspondence, so the three possible encoder blocks are probed for the
/// one that is actually active (CNTL bit 0).
fn dither_register<A: Aperture>(
    gpu: &GpuInstance<A>,
    gen: AmdGen,
    head: usize,
) -> Option<u32> {
    if gen.has_evergreen_display_block() {
        use scanout_regs::amd::evergreen as ev;
        return Some(ev::FMT_BIT_DEPTH_CONTROL + ev::CRTC_REGISTER_OFFSETS[head]);
    }

    use scanout_regs::amd::avivo;
    let encoders = [
        (avivo::TMDSA_CNTL, avivo::TMDSA_BIT_DEPTH_CONTROL),
        (avivo::LVTMA_CNTL, avivo::LVTMA_BIT_DEPTH_CONTROL),
        (avivo::DVOA_CNTL, avivo::DVOA_BIT_DEPTH_CONTROL),
    ];
    encoders
        .into_iter()
        .find(|&(cntl, _)| gpu.read(cntl) & 0x1 != 0)
        .map(|(_, depth)| depth)
}
