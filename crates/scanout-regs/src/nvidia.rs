//! NVIDIA display-engine register map and boot-register identity decode.
//!
//! NVIDIA classification does not use the PCI device ID. The chip family is
//! decoded from the PMC boot register instead, following the scheme used by
//! the reference drivers: the top nibble test selects between the modern
//! (NV10+) encoding and the legacy NV04/NV05 encoding.
//!
//! NVIDIA registers auto-adapt to host byte order; the access layer uses
//! native-endian accesses for them.

/// PMC boot register at the very start of the MMIO aperture. Contains the
/// chip ID; reads as all-ones when the GPU is powered down.
pub const PMC_BOOT_0: u32 = 0x0000_0000;

/// Readback value signalling a powered-down GPU (e.g. the inactive discrete
/// GPU of a switchable-graphics laptop). Distinct from "unknown": callers
/// must skip the adapter rather than interpret garbage.
pub const BOOT0_POWERED_DOWN: u32 = 0xFFFF_FFFF;

/// Raw scanline readout for pre-NV50 CRTCs: `PRE_NV50_RASTER_POSITION +
/// head * PRE_NV50_HEAD_STRIDE`, vertical position in the low 16 bits.
pub const PRE_NV50_RASTER_POSITION: u32 = 0x0060_0808;
pub const PRE_NV50_HEAD_STRIDE: u32 = 0x2000;

/// Raw scanline readout for NV50 and later display engines:
/// `NV50_RASTER_POSITION + head * NV50_HEAD_STRIDE`, vertical position in
/// the low 16 bits.
pub const NV50_RASTER_POSITION: u32 = 0x0061_6340;
pub const NV50_HEAD_STRIDE: u32 = 0x800;

/// Mask of the vertical-position field in the raster position registers.
pub const RASTER_POSITION_MASK: u32 = 0xFFFF;

/// Decoded identity of an NVIDIA adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvIdentity {
    /// Chip recognized; `card_type` is the family ordinal (0x04, 0x10, ...
    /// 0xC0 = Fermi, 0xE0 = Kepler, ...) and `chipset` the full chip ID.
    Chip { card_type: u32, chipset: u32 },
    /// Boot register read back as all-ones: the GPU is powered down.
    PoweredDown,
    /// Boot register contents match no known encoding.
    Unknown,
}

impl NvIdentity {
    /// Display heads driven by this chip family. Pre-Kepler parts expose
    /// two heads, Kepler (0xE0) and later expose four.
    pub fn head_count(self) -> usize {
        match self {
            NvIdentity::Chip { chipset, .. } if chipset >= 0xE0 => 4,
            NvIdentity::Chip { .. } => 2,
            _ => 0,
        }
    }

    /// True for NV50 and later display engines (different raster-position
    /// register layout).
    pub fn is_nv50_plus(self) -> bool {
        matches!(self, NvIdentity::Chip { card_type, .. } if card_type >= 0x50)
    }
}

/// Decodes the PMC boot register into a chip family.
///
/// Modern encoding: when `(boot0 & 0x0f00_0000)` is non-zero, the chipset ID
/// sits in bits 20-27 and the family is a coarse bucketing of its top
/// nibble. Legacy encoding: `(boot0 & 0xff00_fff0) == 0x2000_4000`
/// identifies NV04/NV05.
pub fn decode_boot0(boot0: u32) -> NvIdentity {
    if boot0 == BOOT0_POWERED_DOWN {
        return NvIdentity::PoweredDown;
    }

    if (boot0 & 0x0F00_0000) > 0 {
        let chipset = (boot0 & 0x0FF0_0000) >> 20;
        let card_type = match chipset & 0xF0 {
            0x10 | 0x20 | 0x30 => chipset & 0xF0,
            0x40 | 0x60 => 0x40,
            0x50 | 0x80 | 0x90 | 0xA0 => 0x50,
            0xC0 | 0xD0 => 0xC0,
            0xE0 | 0xF0 => 0xE0,
            _ => return NvIdentity::Unknown,
        };
        NvIdentity::Chip { card_type, chipset }
    } else if (boot0 & 0xFF00_FFF0) == 0x2000_4000 {
        // NV04/NV05 put the chip revision where later chips put the ID.
        let chipset = if (boot0 & 0x00F0_0000) != 0 { 0x05 } else { 0x04 };
        NvIdentity::Chip {
            card_type: 0x04,
            chipset,
        }
    } else {
        NvIdentity::Unknown
    }
}

/// Raster-position register for a head, honoring the NV50 layout split.
pub fn raster_position_offset(identity: NvIdentity, head: usize) -> u32 {
    if identity.is_nv50_plus() {
        NV50_RASTER_POSITION + (head as u32) * NV50_HEAD_STRIDE
    } else {
        PRE_NV50_RASTER_POSITION + (head as u32) * PRE_NV50_HEAD_STRIDE
    }
}
