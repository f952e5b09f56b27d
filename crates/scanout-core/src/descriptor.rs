use scanout_mmio::{Aperture, ByteOrder, Registers};
use scanout_regs::{classify_amd, decode_boot0, head_count, AmdGen, NvIdentity, Vendor};

/// Vendor-specific display-engine generation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Amd(AmdGen),
    Nvidia(NvIdentity),
    /// Intel IGPs: generation differences do not matter for anything this
    /// subsystem does, a fixed pipe layout is assumed.
    Intel,
    Unknown,
}

/// One physical graphics adapter.
///
/// Built once when the context is constructed; immutable afterwards
/// (hot-plug re-detection is out of scope, single detection only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuDescriptor {
    pub vendor: Vendor,
    pub device_id: u16,
    pub generation: Generation,
    /// Number of display heads (CRTCs) this adapter exposes.
    pub head_count: usize,
    /// Length of the mapped control-register aperture in bytes.
    pub aperture_len: u32,
    /// Lower bound for valid register offsets, normally 0.
    pub low_limit: u32,
    /// Some hardware transiently reads a beamposition of 0; queries on
    /// those parts retry within a bounded window before accepting the zero.
    pub retry_zero_beam: bool,
    /// Low-level access gated off by default (lockup errata); identity
    /// queries still work.
    pub access_gated: bool,
}

impl GpuDescriptor {
    /// Classifies an adapter. The NVIDIA path reads the PMC boot register
    /// through `regs` as a side effect of classification; AMD and Intel
    /// classify from PCI identity alone.
    pub fn probe<A: Aperture>(
        vendor_id: u16,
        device_id: u16,
        regs: &mut Registers<A>,
        allow_unsafe: bool,
    ) -> Self {
        let vendor = Vendor::from_pci_vendor_id(vendor_id);
        let (generation, heads, retry_zero_beam, access_gated) = match vendor {
            Vendor::Amd => {
                let gen = classify_amd(device_id);
                (Generation::Amd(gen), head_count(gen), false, false)
            }
            Vendor::Nvidia => {
                let id = decode_boot0(regs.read_register(scanout_regs::nvidia::PMC_BOOT_0));
                // NVIDIA parts are the known transient-zero offenders.
                (Generation::Nvidia(id), id.head_count(), true, false)
            }
            Vendor::Intel => (
                Generation::Intel,
                scanout_regs::intel::PIPE_COUNT,
                false,
                !allow_unsafe,
            ),
            Vendor::Unknown => (Generation::Unknown, 0, false, true),
        };

        Self {
            vendor,
            device_id,
            generation,
            head_count: heads,
            aperture_len: regs.aperture_len(),
            low_limit: regs.low_limit(),
            retry_zero_beam,
            access_gated,
        }
    }

    /// Register byte-order policy for this vendor. Radeon registers are
    /// little-endian on the wire; NVIDIA and Intel auto-adapt.
    pub fn byte_order(vendor: Vendor) -> ByteOrder {
        match vendor {
            Vendor::Amd => ByteOrder::ForcedLittleEndian,
            _ => ByteOrder::HostNative,
        }
    }

    /// True when the adapter reported the powered-down boot sentinel and
    /// must be skipped rather than queried.
    pub fn is_offline(&self) -> bool {
        matches!(self.generation, Generation::Nvidia(NvIdentity::PoweredDown))
    }

    pub fn amd_gen(&self) -> Option<AmdGen> {
        match self.generation {
            Generation::Amd(gen) => Some(gen),
            _ => None,
        }
    }

    /// Command-surface snapshot of the identity.
    pub fn info(&self) -> GpuInfo {
        GpuInfo {
            vendor: self.vendor,
            device_id: self.device_id,
            generation: format_generation(self.generation),
            head_count: self.head_count,
            aperture_len: self.aperture_len,
        }
    }
}

fn format_generation(generation: Generation) -> String {
    match generation {
        Generation::Amd(gen) => gen.to_string(),
        Generation::Nvidia(NvIdentity::Chip { card_type, chipset }) => {
            format!("NV-{card_type:02X} (chipset 0x{chipset:02X})")
        }
        Generation::Nvidia(NvIdentity::PoweredDown) => "powered down".into(),
        Generation::Nvidia(NvIdentity::Unknown) => "unknown NV chip".into(),
        Generation::Intel => "Intel IGP".into(),
        Generation::Unknown => "unknown".into(),
    }
}

/// Identity snapshot returned over the command surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub vendor: Vendor,
    pub device_id: u16,
    pub generation: String,
    pub head_count: usize,
    pub aperture_len: u32,
}
