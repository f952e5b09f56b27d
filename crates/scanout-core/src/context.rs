use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use scanout_mmio::{Aperture, Registers};
use scanout_regs::Vendor;

use crate::beam::BeamTable;
use crate::config::Config;
use crate::descriptor::GpuDescriptor;
use crate::error::GpuError;
use crate::mapping::ScreenMapping;

/// One adapter owned by the context: its identity plus the locked register
/// file. The lock is held for the duration of a single register access
/// only; multi-step procedures (the synchronizer's sleep phases, LUT scans
/// between accesses) run unlocked by construction.
pub struct GpuInstance<A: Aperture> {
    pub descriptor: GpuDescriptor,
    regs: Mutex<Registers<A>>,
    /// Cached pre-disable dither register values, per head, so a later
    /// re-enable restores the exact prior setting.
    pub(crate) dither_cache: Mutex<Vec<Option<u32>>>,
}

impl<A: Aperture> GpuInstance<A> {
    pub fn new(descriptor: GpuDescriptor, regs: Registers<A>) -> Self {
        let heads = descriptor.head_count;
        Self {
            descriptor,
            regs: Mutex::new(regs),
            dither_cache: Mutex::new(vec![None; heads.max(1)]),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registers<A>> {
        // A poisoned register lock still guards a perfectly usable
        // register file; recover instead of propagating the panic.
        self.regs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Single locked register read (sentinel semantics).
    pub fn read(&self, offset: u32) -> u32 {
        self.lock().read_register(offset)
    }

    /// Single locked register write (sentinel semantics).
    pub fn write(&self, offset: u32, value: u32) {
        self.lock().write_register(offset, value);
    }

    /// Read-modify-write under one lock acquisition, so concurrent callers
    /// cannot interleave between the read and the write.
    pub fn update(&self, offset: u32, clear: u32, set: u32) {
        self.lock().update_register(offset, clear, set);
    }

    /// Marks the register mapping dead; subsequent accesses no-op.
    pub fn teardown(&self) {
        self.lock().teardown();
    }

    /// Test/diagnostic access to the register file.
    pub fn with_registers<R>(&self, f: impl FnOnce(&mut Registers<A>) -> R) -> R {
        f(&mut self.lock())
    }
}

/// Owner of all scanout-subsystem state.
///
/// The original tooling kept everything here in process-wide mutable
/// globals; this context makes construction and teardown explicit while
/// preserving the single-context-per-process usage pattern.
pub struct DisplayContext<A: Aperture> {
    gpus: Vec<GpuInstance<A>>,
    /// Index of the GPU all screen-level operations address.
    active: AtomicUsize,
    /// The implausible-readout recovery may switch the active GPU once per
    /// session; this latch keeps it from flapping.
    pub(crate) heuristic_switched: AtomicBool,
    /// True when `SCANOUT_GPU_INDEX` pinned the selection (heuristic off).
    active_pinned: bool,
    mapping: Mutex<ScreenMapping>,
    pub(crate) beam: Mutex<BeamTable>,
    config: Config,
}

impl<A: Aperture> DisplayContext<A> {
    /// Builds a context over pre-probed GPU instances.
    ///
    /// Active-GPU policy: `SCANOUT_GPU_INDEX` wins when set and valid;
    /// otherwise the first adapter that is neither powered down nor an
    /// Intel IGP, falling back to the first non-powered-down adapter.
    pub fn new(gpus: Vec<GpuInstance<A>>, config: Config) -> Result<Self, GpuError> {
        if gpus.is_empty() {
            return Err(GpuError::NoAdapter);
        }

        let (active, pinned) = match config.gpu_index {
            Some(index) if index < gpus.len() => (index, true),
            Some(index) => {
                tracing::warn!(
                    index,
                    count = gpus.len(),
                    "configured GPU index out of range, falling back to auto-selection"
                );
                (default_active(&gpus)?, false)
            }
            None => (default_active(&gpus)?, false),
        };

        let mut mapping = ScreenMapping::identity();
        if let Some(digits) = &config.crtc_map {
            mapping.seed_from_digits(digits);
        }

        tracing::debug!(
            active,
            vendor = %gpus[active].descriptor.vendor,
            device_id = format_args!("0x{:04x}", gpus[active].descriptor.device_id),
            "display context initialized"
        );

        Ok(Self {
            gpus,
            active: AtomicUsize::new(active),
            heuristic_switched: AtomicBool::new(false),
            active_pinned: pinned,
            mapping: Mutex::new(mapping),
            beam: Mutex::new(BeamTable::default()),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gpu_count(&self) -> usize {
        self.gpus.len()
    }

    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// True when the user pinned the active GPU (the switch heuristic must
    /// then stay out of the way).
    pub(crate) fn active_is_pinned(&self) -> bool {
        self.active_pinned
    }

    pub(crate) fn switch_active(&self, to: usize) {
        self.active.store(to, Ordering::Release);
    }

    pub fn active_gpu(&self) -> Result<&GpuInstance<A>, GpuError> {
        let gpu = &self.gpus[self.active_index()];
        if gpu.descriptor.access_gated {
            return Err(GpuError::UnsafeGpuGated);
        }
        Ok(gpu)
    }

    pub fn gpu(&self, index: usize) -> Option<&GpuInstance<A>> {
        self.gpus.get(index)
    }

    pub fn active_descriptor(&self) -> Result<&GpuDescriptor, GpuError> {
        Ok(&self.active_gpu()?.descriptor)
    }

    pub(crate) fn mapping_lock(&self) -> MutexGuard<'_, ScreenMapping> {
        self.mapping.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Logical screen to physical head, rank 0.
    pub fn screen_to_head(&self, screen: usize, rank: usize) -> i32 {
        self.mapping_lock().head_for(screen, rank)
    }

    pub fn screen_to_crtc(&self, screen: usize, rank: usize) -> i32 {
        self.mapping_lock().crtc_for(screen, rank)
    }

    /// Explicit mapping override; permanently disables auto-detection.
    pub fn set_screen_to_head(&self, screen: usize, rank: usize, head: i32) {
        self.mapping_lock().set_head_for(screen, rank, head);
    }

    pub fn set_screen_to_crtc(&self, screen: usize, rank: usize, crtc: i32) {
        self.mapping_lock().set_crtc_for(screen, rank, crtc);
    }

    /// Resolves a logical screen to a validated head index on the active
    /// GPU. Invalid indices are caller bugs: reported at error severity and
    /// rejected before any register is touched.
    pub(crate) fn resolve_screen(&self, screen: usize) -> Result<usize, GpuError> {
        let head = self.screen_to_head(screen, 0);
        if head < 0 {
            tracing::error!(screen, "no output mapped for logical screen");
            return Err(GpuError::InvalidScreen(screen));
        }
        self.validate_head(head as usize)
    }

    pub(crate) fn validate_head(&self, head: usize) -> Result<usize, GpuError> {
        let count = self.active_descriptor()?.head_count;
        if head >= count {
            tracing::error!(head, count, "head index out of range");
            return Err(GpuError::InvalidHead { head, count });
        }
        Ok(head)
    }

    /// Raw register read on the active GPU (sentinel semantics preserved).
    pub fn read_register(&self, offset: u32) -> Result<u32, GpuError> {
        Ok(self.active_gpu()?.read(offset))
    }

    /// Raw register write on the active GPU (sentinel semantics preserved).
    pub fn write_register(&self, offset: u32, value: u32) -> Result<(), GpuError> {
        self.active_gpu()?.write(offset, value);
        Ok(())
    }

    /// Tears down every register mapping. The context remains queryable
    /// for identity, but all register traffic no-ops from here on.
    pub fn teardown(&self) {
        for gpu in &self.gpus {
            gpu.teardown();
        }
    }
}

fn default_active<A: Aperture>(gpus: &[GpuInstance<A>]) -> Result<usize, GpuError> {
    let preferred = gpus.iter().position(|g| {
        !g.descriptor.is_offline() && g.descriptor.vendor != Vendor::Intel
    });
    preferred
        .or_else(|| gpus.iter().position(|g| !g.descriptor.is_offline()))
        .ok_or(GpuError::NoAdapter)
}
