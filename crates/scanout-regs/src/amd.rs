//! AMD/ATI display-engine register maps.
//!
//! Two hardware families are covered:
//! - `avivo`: the AVIVO display block used by DCE-1/2/3 parts (R500..R700).
//!   Two CRTCs, D1 at the base offsets below and D2 at `+0x800`.
//! - `evergreen`: the DCE-4 and later display block (Evergreen through
//!   Polaris). Up to six CRTCs, each register given relative to a per-CRTC
//!   block offset from [`evergreen::CRTC_REGISTER_OFFSETS`].
//!
//! All Radeon registers are little-endian on the wire regardless of host
//! byte order; the access layer is responsible for the swap.

/// AVIVO display block (DCE-1/2/3). Per-CRTC registers are given for the D1
/// block; add [`avivo::CRTC_BLOCK_STRIDE`] for D2.
pub mod avivo {
    /// Byte distance between the D1 and D2 CRTC register blocks.
    pub const CRTC_BLOCK_STRIDE: u32 = 0x800;
    /// Number of CRTCs in the AVIVO display block.
    pub const CRTC_COUNT: usize = 2;

    pub const D1CRTC_H_TOTAL: u32 = 0x6000;
    pub const D1CRTC_V_TOTAL: u32 = 0x6020;
    /// Start/end scanline of the vertical blank interval. Start in bits
    /// 0-12, end in bits 16-28.
    pub const D1CRTC_V_BLANK_START_END: u32 = 0x6024;
    /// Bit 0 enables the CRTC.
    pub const D1CRTC_CONTROL: u32 = 0x6080;
    /// Bit 0 is the live "in vertical blank" status bit.
    pub const D1CRTC_STATUS: u32 = 0x609C;
    /// Current raster position: vertical in bits 0-12, horizontal in bits
    /// 16-28.
    pub const D1CRTC_STATUS_POSITION: u32 = 0x60A0;

    /// Shared CRTC master enable, one bit per head. Writing the register
    /// latches every head's enable bit on the same clock edge, which is what
    /// the display-head synchronizer relies on.
    pub const DC_CRTC_MASTER_EN: u32 = 0x60F8;

    /// Vertical-position field mask of [`D1CRTC_STATUS_POSITION`].
    pub const VBEAM_POSITION_MASK: u32 = 0x1FFF;
    /// Shift of the horizontal-position field of [`D1CRTC_STATUS_POSITION`].
    pub const HBEAM_POSITION_SHIFT: u32 = 16;

    // Shared hardware LUT access block. A single set of index/data registers
    // is multiplexed over both palettes via DC_LUT_RW_SELECT.
    pub const DC_LUT_RW_SELECT: u32 = 0x6480;
    pub const DC_LUT_RW_MODE: u32 = 0x6484;
    pub const DC_LUT_RW_INDEX: u32 = 0x6488;
    pub const DC_LUT_SEQ_COLOR: u32 = 0x648C;
    pub const DC_LUT_PWL_DATA: u32 = 0x6490;
    /// 30-bit packed RGB LUT slot data (10 bits per channel, top 2 bits
    /// undefined on readback).
    pub const DC_LUT_30_COLOR: u32 = 0x6494;
    pub const DC_LUT_READ_PIPE_SELECT: u32 = 0x6498;
    pub const DC_LUT_WRITE_EN_MASK: u32 = 0x649C;
    pub const DC_LUT_AUTOFILL: u32 = 0x64A0;

    /// Per-palette control/offset block. LUT A at these offsets, LUT B at
    /// `+LUT_BLOCK_STRIDE`.
    pub const LUT_BLOCK_STRIDE: u32 = 0x800;
    pub const DC_LUTA_CONTROL: u32 = 0x64C0;
    pub const DC_LUTA_BLACK_OFFSET_BLUE: u32 = 0x64C4;
    pub const DC_LUTA_BLACK_OFFSET_GREEN: u32 = 0x64C8;
    pub const DC_LUTA_BLACK_OFFSET_RED: u32 = 0x64CC;
    pub const DC_LUTA_WHITE_OFFSET_BLUE: u32 = 0x64D0;
    pub const DC_LUTA_WHITE_OFFSET_GREEN: u32 = 0x64D4;
    pub const DC_LUTA_WHITE_OFFSET_RED: u32 = 0x64D8;

    // Digital output encoder blocks. On this generation there is no static
    // CRTC-to-encoder correspondence: dither control has to probe which
    // encoder is active (bit 0 of the CNTL register) and use its
    // BIT_DEPTH_CONTROL.
    pub const TMDSA_CNTL: u32 = 0x7880;
    pub const TMDSA_BIT_DEPTH_CONTROL: u32 = 0x7894;
    pub const LVTMA_CNTL: u32 = 0x7A80;
    pub const LVTMA_BIT_DEPTH_CONTROL: u32 = 0x7A94;
    pub const DVOA_CNTL: u32 = 0x7980;
    pub const DVOA_BIT_DEPTH_CONTROL: u32 = 0x7988;
}

/// Evergreen / DCE-4+ display block. All `CRTC_*` and `DC_LUT_*` offsets are
/// relative: add the per-CRTC block offset from [`CRTC_REGISTER_OFFSETS`].
pub mod evergreen {
    /// Per-CRTC register block offsets for the six possible CRTCs, as
    /// published in the Evergreen register reference (derived from the
    /// absolute block bases 0x6df0, 0x79f0, 0x105f0, 0x111f0, 0x11df0,
    /// 0x129f0).
    pub const CRTC_REGISTER_OFFSETS: [u32; 6] = [
        0x0,
        0x79F0 - 0x6DF0,
        0x105F0 - 0x6DF0,
        0x111F0 - 0x6DF0,
        0x11DF0 - 0x6DF0,
        0x129F0 - 0x6DF0,
    ];

    pub const CRTC_V_TOTAL: u32 = 0x6E1C;
    /// Vblank start scanline in bits 0-12, end scanline in bits 16-28.
    pub const CRTC_V_BLANK_START_END: u32 = 0x6E34;
    /// Bit 0 ([`CRTC_MASTER_EN`]) enables this CRTC.
    pub const CRTC_CONTROL: u32 = 0x6E70;
    pub const CRTC_MASTER_EN: u32 = 1 << 0;
    /// Readback of the actual pipeline run state in [`CRTC_CONTROL`]: the
    /// enable bit only requests a state, this bit confirms the pipeline
    /// reached it.
    pub const CRTC_MASTER_EN_STATE: u32 = 1 << 16;
    pub const CRTC_BLANK_CONTROL: u32 = 0x6E74;
    /// Bit 0 ([`CRTC_V_BLANK`]) is the live vblank status.
    pub const CRTC_STATUS: u32 = 0x6E8C;
    pub const CRTC_V_BLANK: u32 = 1 << 0;
    /// Current raster position, vertical field in bits 0-12.
    pub const CRTC_STATUS_POSITION: u32 = 0x6E90;
    pub const CRTC_STATUS_HV_COUNT: u32 = 0x6EA0;
    pub const CRTC_UPDATE_LOCK: u32 = 0x6ED4;
    pub const MASTER_UPDATE_LOCK: u32 = 0x6EF4;
    pub const MASTER_UPDATE_MODE: u32 = 0x6EF8;

    pub const DATA_FORMAT: u32 = 0x6B00;
    /// Per-CRTC dither/truncation control (the FMT block follows the CRTC
    /// on DCE-4+, unlike AVIVO's shared encoder blocks).
    pub const FMT_BIT_DEPTH_CONTROL: u32 = 0x6FC8;

    /// Vertical-position field mask of [`CRTC_STATUS_POSITION`].
    pub const VBEAM_POSITION_MASK: u32 = 0x1FFF;

    // Per-CRTC hardware LUT block.
    pub const DC_LUT_CONTROL: u32 = 0x69A0;
    pub const DC_LUT_BLACK_OFFSET_BLUE: u32 = 0x69A4;
    pub const DC_LUT_BLACK_OFFSET_GREEN: u32 = 0x69A8;
    pub const DC_LUT_BLACK_OFFSET_RED: u32 = 0x69AC;
    pub const DC_LUT_WHITE_OFFSET_BLUE: u32 = 0x69B0;
    pub const DC_LUT_WHITE_OFFSET_GREEN: u32 = 0x69B4;
    pub const DC_LUT_WHITE_OFFSET_RED: u32 = 0x69B8;
    pub const DC_LUT_RW_MODE: u32 = 0x69E0;
    pub const DC_LUT_RW_INDEX: u32 = 0x69E4;
    pub const DC_LUT_SEQ_COLOR: u32 = 0x69E8;
    pub const DC_LUT_PWL_DATA: u32 = 0x69EC;
    /// 30-bit packed RGB LUT slot data.
    pub const DC_LUT_30_COLOR: u32 = 0x69F0;
    pub const DC_LUT_VGA_ACCESS_ENABLE: u32 = 0x69F4;
    pub const DC_LUT_WRITE_EN_MASK: u32 = 0x69F8;
    pub const DC_LUT_AUTOFILL: u32 = 0x69FC;

    // Auxiliary color pipeline stages (DCE-5+ naming, present from DCE-4.1
    // APUs onward). An identity LUT alone is not a passthrough if any of
    // these still applies a transform, so load_identity_lut forces them all
    // to bypass.
    pub const INPUT_GAMMA_CONTROL: u32 = 0x6840;
    pub const INPUT_GAMMA_USE_LUT: u32 = 0;
    pub const INPUT_GAMMA_BYPASS: u32 = 1;
    pub const PRESCALE_GRPH_CONTROL: u32 = 0x68B4;
    pub const GRPH_PRESCALE_BYPASS: u32 = 1 << 4;
    pub const PRESCALE_OVL_CONTROL: u32 = 0x68C4;
    pub const OVL_PRESCALE_BYPASS: u32 = 1 << 4;
    pub const INPUT_CSC_CONTROL: u32 = 0x68D4;
    pub const OUTPUT_CSC_CONTROL: u32 = 0x68F0;
    pub const DEGAMMA_CONTROL: u32 = 0x6960;
    pub const GAMUT_REMAP_CONTROL: u32 = 0x6964;
    pub const REGAMMA_CONTROL: u32 = 0x6A80;
}

/// Packs one identity-ramp LUT slot: each 10-bit channel carries the 8-bit
/// slot index shifted up by 2 (so slot 255 maps to 0x3FC in all channels).
pub const fn identity_lut_slot(index: u32) -> u32 {
    let channel = (index << 2) & 0x3FF;
    (channel << 20) | (channel << 10) | channel
}

/// Mask selecting the 30 defined bits of a packed LUT slot readback.
pub const LUT_SLOT_MASK: u32 = 0x3FFF_FFFF;

/// Number of slots in the hardware gamma LUT.
pub const LUT_SLOT_COUNT: u32 = 256;
