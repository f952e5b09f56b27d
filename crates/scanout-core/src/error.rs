use scanout_mmio::AccessError;

/// Error taxonomy for the scanout subsystem.
///
/// Everything here is recoverable: callers fall back to default behavior on
/// `Unsupported`, and invalid-index errors indicate caller bugs (reported
/// loudly, operation aborted before touching hardware). Out-of-range raw
/// register offsets deliberately do NOT surface here; the sentinel
/// primitives in `scanout-mmio` absorb them silently.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("operation not supported on this GPU vendor/generation")]
    Unsupported,

    #[error("no usable display adapter")]
    NoAdapter,

    #[error("head {head} out of range, GPU exposes {count} heads")]
    InvalidHead { head: usize, count: usize },

    #[error("logical screen {0} out of range")]
    InvalidScreen(usize),

    #[error("low-level access to this GPU is disabled (set SCANOUT_ALLOW_UNSAFE_GPUS=1 to override)")]
    UnsafeGpuGated,

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
