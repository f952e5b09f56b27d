//! Display-engine register maps and GPU identity classification.
//!
//! This crate is intentionally self-contained pure data + pure functions so
//! it can be consumed from any context (including code that must not
//! allocate or log). It provides:
//! - Named MMIO register offsets and bit-field masks for the display engines
//!   this project can drive: AMD AVIVO (DCE-1/2/3), AMD Evergreen and later
//!   (DCE-4 through DCE-11.2), NVIDIA pre/post-NV50, and Intel pipes.
//! - PCI vendor identification and per-vendor generation classification.
//!
//! Every register offset here is a hardware contract, reproduced exactly as
//! published in vendor documentation and reference drivers. None of these
//! values are tunable.

pub mod amd;
pub mod intel;
pub mod nvidia;

mod family;

pub use family::{classify_amd, head_count, AmdGen, AMD_CLASSIFICATION_TABLE};
pub use nvidia::{decode_boot0, NvIdentity};

/// PCI vendor ID for NVIDIA Corporation.
pub const PCI_VENDOR_NVIDIA: u16 = 0x10DE;
/// PCI vendor ID for ATI Technologies (pre-acquisition Radeon parts).
pub const PCI_VENDOR_ATI: u16 = 0x1002;
/// PCI vendor ID for AMD (post-acquisition Radeon parts and APUs).
pub const PCI_VENDOR_AMD: u16 = 0x1022;
/// PCI vendor ID for Intel Corporation.
pub const PCI_VENDOR_INTEL: u16 = 0x8086;

/// GPU vendor family, derived from the PCI vendor ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Unknown,
    Nvidia,
    Amd,
    Intel,
}

impl Vendor {
    /// Classifies a raw PCI vendor ID. Vendors outside the supported set
    /// report [`Vendor::Unknown`]; callers treat those adapters as opaque.
    pub fn from_pci_vendor_id(vendor_id: u16) -> Self {
        match vendor_id {
            PCI_VENDOR_NVIDIA => Vendor::Nvidia,
            PCI_VENDOR_ATI | PCI_VENDOR_AMD => Vendor::Amd,
            PCI_VENDOR_INTEL => Vendor::Intel,
            _ => Vendor::Unknown,
        }
    }
}

impl core::fmt::Display for Vendor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Vendor::Unknown => "unknown",
            Vendor::Nvidia => "NVIDIA",
            Vendor::Amd => "AMD/ATI",
            Vendor::Intel => "Intel",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_ids_map_to_families() {
        assert_eq!(Vendor::from_pci_vendor_id(0x10DE), Vendor::Nvidia);
        assert_eq!(Vendor::from_pci_vendor_id(0x1002), Vendor::Amd);
        assert_eq!(Vendor::from_pci_vendor_id(0x1022), Vendor::Amd);
        assert_eq!(Vendor::from_pci_vendor_id(0x8086), Vendor::Intel);
        assert_eq!(Vendor::from_pci_vendor_id(0x1234), Vendor::Unknown);
    }
}
