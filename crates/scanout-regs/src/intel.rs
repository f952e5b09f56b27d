//! Intel IGP display pipe register map.
//!
//! Only the raster-position and pipe-timing registers needed for
//! beamposition queries are mapped. Intel parts are identify-only by
//! default: several IGP generations are documented to lock up when display
//! registers are accessed concurrently with the OS driver, so everything
//! beyond reads is gated behind an explicit opt-in at the context level.
//!
//! Registers auto-adapt to host byte order (native-endian access policy).

/// Per-pipe register stride (pipe A at the base offset, pipe B at +0x1000,
/// pipe C at +0x2000).
pub const PIPE_STRIDE: u32 = 0x1000;

/// Assumed pipe count across supported IGP generations.
pub const PIPE_COUNT: usize = 3;

/// Display scanline counter for pipe A; current vertical position in bits
/// 0-12.
pub const PIPEA_DSL: u32 = 0x0007_0000;

/// Pipe A configuration/state: bit 31 = enable request, bit 30 = actual
/// running state.
pub const PIPEA_CONF: u32 = 0x0007_0008;
pub const PIPE_CONF_ENABLE: u32 = 1 << 31;
pub const PIPE_CONF_STATE: u32 = 1 << 30;

/// Pipe A vertical total: active line count in bits 0-12, total (including
/// blanking) in bits 16-28.
pub const VTOTAL_A: u32 = 0x0006_000C;
/// Pipe A vertical blank: start line in bits 0-12, end line in bits 16-28.
pub const VBLANK_A: u32 = 0x0006_0010;

/// Mask of the vertical-position field of the `*_DSL` registers.
pub const DSL_MASK: u32 = 0x1FFF;

/// Scanline-counter register for a pipe.
pub fn dsl_offset(pipe: usize) -> u32 {
    PIPEA_DSL + (pipe as u32) * PIPE_STRIDE
}

/// Configuration/state register for a pipe.
pub fn conf_offset(pipe: usize) -> u32 {
    PIPEA_CONF + (pipe as u32) * PIPE_STRIDE
}

/// Vertical-total timing register for a pipe.
pub fn vtotal_offset(pipe: usize) -> u32 {
    VTOTAL_A + (pipe as u32) * PIPE_STRIDE
}

/// Vertical-blank timing register for a pipe.
pub fn vblank_offset(pipe: usize) -> u32 {
    VBLANK_A + (pipe as u32) * PIPE_STRIDE
}
