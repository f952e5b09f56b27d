//! Environment-variable configuration.
//!
//! Parsed once at context construction; later changes to the process
//! environment have no effect.

/// `SCANOUT_CRTC_MAP`: one digit per logical screen mapping it to a
/// physical CRTC index, e.g. `10` maps screen 0 to CRTC 1 and screen 1 to
/// CRTC 0.
pub const ENV_CRTC_MAP: &str = "SCANOUT_CRTC_MAP";

/// `SCANOUT_GPU_INDEX`: selects the active GPU on multi-GPU systems. When
/// set, the implausible-beamposition switch heuristic is disabled; the
/// user's choice is authoritative.
pub const ENV_GPU_INDEX: &str = "SCANOUT_GPU_INDEX";

/// `SCANOUT_ALLOW_UNSAFE_GPUS`: opt-in to low-level access on GPU types
/// gated off by default (Intel IGPs with known lockup errata under
/// concurrent register access).
pub const ENV_ALLOW_UNSAFE: &str = "SCANOUT_ALLOW_UNSAFE_GPUS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Initial per-screen CRTC override, from [`ENV_CRTC_MAP`].
    pub crtc_map: Option<Vec<usize>>,
    /// Pinned active-GPU index, from [`ENV_GPU_INDEX`].
    pub gpu_index: Option<usize>,
    /// Allow access to gated GPU types, from [`ENV_ALLOW_UNSAFE`].
    pub allow_unsafe_gpus: bool,
}

impl Config {
    /// Reads the configuration from the process environment. Malformed
    /// values are ignored with a warning rather than failing construction.
    pub fn from_env() -> Self {
        let crtc_map = std::env::var(ENV_CRTC_MAP).ok().and_then(|s| {
            let digits: Option<Vec<usize>> = s
                .trim()
                .chars()
                .map(|c| c.to_digit(10).map(|d| d as usize))
                .collect();
            if digits.is_none() {
                tracing::warn!("{ENV_CRTC_MAP}={s:?} is not a digit string, ignored");
            }
            digits
        });

        let gpu_index = std::env::var(ENV_GPU_INDEX).ok().and_then(|s| {
            let parsed = s.trim().parse::<usize>().ok();
            if parsed.is_none() {
                tracing::warn!("{ENV_GPU_INDEX}={s:?} is not an index, ignored");
            }
            parsed
        });

        let allow_unsafe_gpus = std::env::var(ENV_ALLOW_UNSAFE)
            .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            crtc_map,
            gpu_index,
            allow_unsafe_gpus,
        }
    }
}
