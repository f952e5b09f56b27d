//! AMD display-engine generation classification.
//!
//! The classifier is a single ordered table of `(mask, value, generation)`
//! tuples over the 16-bit PCI device ID. A device's generation is the
//! **maximum** ordinal among all matching entries; "is at least generation
//! G" is then a plain ordinal comparison. The max rule is what resolves the
//! ambiguous overlaps in AMD's ID space (e.g. `0x68xx` is Evergreen/DCE-4
//! broadly, but `0x6800..0x683F` was reused for Southern Islands/DCE-6
//! parts), and it makes the classification monotonic by construction.

/// AMD display-engine generation ordinal. Ordering is meaningful:
/// `gen >= AmdGen::Dce4` is the "is at least DCE-4" test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum AmdGen {
    Dce1,
    Dce2,
    Dce3,
    Dce4,
    Dce41,
    Dce5,
    Dce6,
    Dce61,
    Dce64,
    Dce8,
    Dce10,
    Dce11,
    Dce112,
}

impl AmdGen {
    /// Monotone containment: once a device matches generation `g`, it also
    /// reports true for every generation below it.
    pub fn at_least(self, g: AmdGen) -> bool {
        self >= g
    }

    /// True for the Evergreen-style display block (per-CRTC register
    /// blocks, per-head enable bits).
    pub fn has_evergreen_display_block(self) -> bool {
        self.at_least(AmdGen::Dce4)
    }
}

impl core::fmt::Display for AmdGen {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            AmdGen::Dce1 => "DCE-1",
            AmdGen::Dce2 => "DCE-2",
            AmdGen::Dce3 => "DCE-3",
            AmdGen::Dce4 => "DCE-4",
            AmdGen::Dce41 => "DCE-4.1",
            AmdGen::Dce5 => "DCE-5",
            AmdGen::Dce6 => "DCE-6",
            AmdGen::Dce61 => "DCE-6.1",
            AmdGen::Dce64 => "DCE-6.4",
            AmdGen::Dce8 => "DCE-8",
            AmdGen::Dce10 => "DCE-10",
            AmdGen::Dce11 => "DCE-11",
            AmdGen::Dce112 => "DCE-11.2",
        };
        f.write_str(name)
    }
}

/// One device-ID range test: the entry matches when
/// `device_id & mask == value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmdIdRange {
    pub mask: u16,
    pub value: u16,
    pub gen: AmdGen,
}

const fn range(mask: u16, value: u16, gen: AmdGen) -> AmdIdRange {
    AmdIdRange { mask, value, gen }
}

/// Device-ID range tests against AMD's published ID assignments. Order is
/// irrelevant: classification takes the maximum matching generation.
pub const AMD_CLASSIFICATION_TABLE: &[AmdIdRange] = &[
    // R520/RV515/RV530/RV570 (first AVIVO parts).
    range(0xFF00, 0x7100, AmdGen::Dce1),
    range(0xFF00, 0x7200, AmdGen::Dce1),
    // R600/RV610/RV630.
    range(0xFF00, 0x9400, AmdGen::Dce2),
    // RV620/RV635/RV670 and RV7xx.
    range(0xFF00, 0x9500, AmdGen::Dce3),
    // RS780/RS880 IGPs.
    range(0xFF00, 0x9600, AmdGen::Dce3),
    // Evergreen: Cedar/Redwood/Juniper/Cypress/Hemlock. The low quarter of
    // this range was later reused for Southern Islands; the DCE-6 entries
    // below out-rank this one for those IDs.
    range(0xFF00, 0x6800, AmdGen::Dce4),
    // Palm APUs.
    range(0xFFF0, 0x9800, AmdGen::Dce41),
    // Sumo/Sumo2 APUs.
    range(0xFFF0, 0x9640, AmdGen::Dce41),
    // Northern Islands: Barts/Turks/Caicos/Cayman.
    range(0xFF00, 0x6700, AmdGen::Dce5),
    // Southern Islands: Tahiti.
    range(0xFFF0, 0x6780, AmdGen::Dce6),
    range(0xFFF0, 0x6790, AmdGen::Dce6),
    // Southern Islands: Pitcairn.
    range(0xFFF0, 0x6800, AmdGen::Dce6),
    range(0xFFF0, 0x6810, AmdGen::Dce6),
    // Southern Islands: Cape Verde.
    range(0xFFF0, 0x6820, AmdGen::Dce6),
    range(0xFFF0, 0x6830, AmdGen::Dce6),
    // Trinity/Richland APUs.
    range(0xFF00, 0x9900, AmdGen::Dce61),
    // Oland (two display heads only).
    range(0xFF00, 0x6600, AmdGen::Dce64),
    // Sea Islands: Bonaire.
    range(0xFFF0, 0x6640, AmdGen::Dce8),
    range(0xFFF0, 0x6650, AmdGen::Dce8),
    // Sea Islands: Hawaii.
    range(0xFFF0, 0x67A0, AmdGen::Dce8),
    range(0xFFF0, 0x67B0, AmdGen::Dce8),
    // Kaveri APUs.
    range(0xFF00, 0x1300, AmdGen::Dce8),
    // Kabini / Mullins APUs.
    range(0xFFF0, 0x9830, AmdGen::Dce8),
    range(0xFFF0, 0x9850, AmdGen::Dce8),
    // Volcanic Islands: Tonga.
    range(0xFFF0, 0x6920, AmdGen::Dce10),
    range(0xFFF0, 0x6930, AmdGen::Dce10),
    // Carrizo / Stoney APUs.
    range(0xFFF0, 0x9870, AmdGen::Dce11),
    range(0xFFF0, 0x98E0, AmdGen::Dce11),
    // Fiji.
    range(0xFFF0, 0x7300, AmdGen::Dce11),
    // Polaris 10/11/12.
    range(0xFFF0, 0x67C0, AmdGen::Dce112),
    range(0xFFF0, 0x67D0, AmdGen::Dce112),
    range(0xFFF0, 0x67E0, AmdGen::Dce112),
    range(0xFFF0, 0x67F0, AmdGen::Dce112),
    range(0xFFF0, 0x6980, AmdGen::Dce112),
    range(0xFFF0, 0x6990, AmdGen::Dce112),
];

/// Classifies an AMD PCI device ID into a display-engine generation.
///
/// Unrecognized IDs are assumed to be newer than everything in the table
/// and classify as the latest known generation, so new silicon degrades to
/// "most modern register layout" rather than "unsupported".
pub fn classify_amd(device_id: u16) -> AmdGen {
    AMD_CLASSIFICATION_TABLE
        .iter()
        .filter(|r| device_id & r.mask == r.value)
        .map(|r| r.gen)
        .max()
        .unwrap_or(AmdGen::Dce112)
}

/// Display heads exposed per generation.
pub fn head_count(gen: AmdGen) -> usize {
    match gen {
        AmdGen::Dce1 | AmdGen::Dce2 | AmdGen::Dce3 => 2,
        AmdGen::Dce41 | AmdGen::Dce64 => 2,
        AmdGen::Dce61 => 4,
        AmdGen::Dce11 => 3,
        AmdGen::Dce4
        | AmdGen::Dce5
        | AmdGen::Dce6
        | AmdGen::Dce8
        | AmdGen::Dce10
        | AmdGen::Dce112 => 6,
    }
}
