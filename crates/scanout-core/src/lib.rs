//! Display scanout control: beamposition queries, display-head
//! synchronization, hardware LUT and dither control.
//!
//! This crate implements the vendor-independent logic over the register
//! maps from `scanout-regs` and the access discipline from `scanout-mmio`:
//! - [`GpuDescriptor`]: one physical adapter's identity (vendor, display
//!   generation, head count, aperture geometry), built once at context
//!   construction.
//! - [`DisplayContext`]: the explicit owner of all subsystem state that the
//!   original tooling kept in process-wide globals: GPU instances, the
//!   logical-screen-to-CRTC mapping table, beamposition corrections and
//!   health latches. One context per process is the intended use, but
//!   nothing here is a hidden singleton.
//! - Beamposition queries with per-generation decode, vblank-interval
//!   correction and bounded retry ([`DisplayContext::beam_position`]).
//! - The display-head synchronizer ([`DisplayContext::synchronize_heads`]),
//!   a deliberately multi-second blocking procedure.
//! - LUT classification/identity setup and dither control.
//!
//! Concurrency model: every individual register access takes the per-GPU
//! register lock for just that access. The multi-second sleep phases of the
//! synchronizer and the probe delays of mapping auto-detection run outside
//! any lock.

mod beam;
mod command;
mod config;
mod context;
mod descriptor;
mod error;
mod lut;
mod mapping;
mod sync;

pub mod timing;

pub use beam::BeamCorrection;
pub use command::{Command, Reply};
pub use config::Config;
pub use context::{DisplayContext, GpuInstance};
pub use descriptor::{Generation, GpuDescriptor, GpuInfo};
pub use error::GpuError;
pub use lut::LutState;
pub use mapping::{OutputGammaChannel, ScreenMapping, MAX_OUTPUTS_PER_SCREEN, MAX_SCREENS};
pub use sync::{SyncMethod, SyncOutcome};

/// Sentinel for "no such output / unsupported" in signed head lookups.
pub const NO_OUTPUT: i32 = -1;

/// Sentinel for unsupported unsigned results (LUT state on foreign GPUs).
pub const UNSUPPORTED: u32 = 0xFFFF_FFFF;
