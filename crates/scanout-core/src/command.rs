//! Process-boundary command surface.
//!
//! A small fixed set of operations with small integer arguments, shaped so
//! an embedder (scripting-engine binding, ioctl dispatcher, CLI) can
//! forward requests without knowing the API types. Errors never cross this
//! boundary as errors: each operation's documented failure sentinel is
//! encoded in the reply instead.

use std::time::Duration;

use scanout_mmio::Aperture;

use crate::context::DisplayContext;
use crate::descriptor::GpuInfo;
use crate::sync::SyncMethod;
use crate::UNSUPPORTED;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Raw register read on the active GPU; out-of-range reads the 0
    /// sentinel.
    ReadRegister { offset: u32 },
    /// Raw register write; out-of-range is a silent no-op.
    WriteRegister { offset: u32, value: u32 },
    /// Beamposition for a logical screen.
    GetBeamPosition { screen: usize },
    /// Phase-align the heads driving `screens`. Blocks for seconds.
    SynchronizeDisplayHeads {
        screens: Vec<usize>,
        method: SyncMethod,
        timeout: Duration,
        allowed_residual: u32,
    },
    SetDitherMode { screen: usize, value: u32 },
    GetLutState { screen: usize, head: usize, debug: bool },
    LoadIdentityLut { screen: usize, head: usize },
    GetGpuInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Register value, or LUT classification code ([`UNSUPPORTED`] for
    /// foreign GPUs).
    Value(u32),
    /// Scanline, or -1 for unsupported/unhealthy.
    Beam(i32),
    /// Residual scanlines after synchronization.
    Residual(i64),
    /// Operation outcome for write-style commands.
    Done(bool),
    Info(GpuInfo),
    /// The operation is not implemented for this GPU at all.
    Unsupported,
}

impl<A: Aperture> DisplayContext<A> {
    /// Dispatches one command-surface request.
    pub fn dispatch(&self, command: Command) -> Reply {
        match command {
            Command::ReadRegister { offset } => match self.read_register(offset) {
                Ok(value) => Reply::Value(value),
                Err(_) => Reply::Unsupported,
            },
            Command::WriteRegister { offset, value } => {
                Reply::Done(self.write_register(offset, value).is_ok())
            }
            Command::GetBeamPosition { screen } => Reply::Beam(self.beam_position(screen)),
            Command::SynchronizeDisplayHeads {
                screens,
                method,
                timeout,
                allowed_residual,
            } => match self.synchronize_heads(&screens, method, timeout, allowed_residual) {
                Ok(outcome) => Reply::Residual(outcome.residual),
                Err(_) => Reply::Unsupported,
            },
            Command::SetDitherMode { screen, value } => {
                let head = match self.resolve_screen(screen) {
                    Ok(head) => head,
                    Err(_) => return Reply::Done(false),
                };
                Reply::Done(self.set_dither_mode(head, value).is_ok())
            }
            Command::GetLutState { screen, head, debug } => {
                // The screen argument selects the GPU context in the
                // original surface; with a single active GPU it only
                // participates in validation.
                if self.resolve_screen(screen).is_err() {
                    return Reply::Value(UNSUPPORTED);
                }
                match self.lut_state(head, debug) {
                    Ok(state) => Reply::Value(state.code()),
                    Err(_) => Reply::Value(UNSUPPORTED),
                }
            }
            Command::LoadIdentityLut { screen, head } => {
                if self.resolve_screen(screen).is_err() {
                    return Reply::Done(false);
                }
                Reply::Done(self.load_identity_lut(head).is_ok())
            }
            Command::GetGpuInfo => match self.active_descriptor() {
                Ok(descriptor) => Reply::Info(descriptor.info()),
                Err(_) => Reply::Unsupported,
            },
        }
    }
}
