//! Bounds-checked, endianness-aware MMIO register access.
//!
//! This crate provides:
//! - [`Aperture`]: the backing-store seam. Backends are the in-memory
//!   [`MockAperture`] used throughout the test suites and (on Linux) the
//!   [`linux::BarMapping`] over a PCI BAR resource file.
//! - [`Registers`]: the access discipline layered on an aperture: low-limit
//!   and length bounds checks, per-vendor byte-order policy, a full memory
//!   fence after every write, and an atomic lifecycle flag so a mapping can
//!   be torn down while other references still exist.
//!
//! Two access surfaces are exposed:
//! - [`Registers::read_register`] / [`Registers::write_register`]: the
//!   sentinel primitives. Out-of-range or torn-down access reads as `0` and
//!   writes as a no-op. These never fail, never allocate and never log, so
//!   they are callable from contexts that cannot handle errors (the
//!   documented contract is that the sentinel IS the failure signal).
//! - [`Registers::try_read_register`] / [`Registers::try_write_register`]:
//!   `Result`-returning variants for ordinary callers that want the reason.

use std::sync::atomic::{fence, AtomicBool, Ordering};

#[cfg(target_os = "linux")]
pub mod linux;

/// Register byte-order policy for an adapter.
///
/// Radeon registers are little-endian on the wire regardless of host byte
/// order, so they need an explicit swap on big-endian hosts. NVIDIA and
/// Intel register apertures auto-adapt to the host and are accessed
/// native-endian. Getting this wrong does not fault; it silently corrupts
/// every readout, so the policy is fixed per vendor at descriptor-build
/// time and never guessed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Device registers are little-endian; swap on big-endian hosts.
    ForcedLittleEndian,
    /// Device registers follow host byte order.
    HostNative,
}

impl ByteOrder {
    /// Decodes a raw aperture word into a register value.
    #[inline]
    pub fn decode(self, raw: u32, host_big_endian: bool) -> u32 {
        match self {
            ByteOrder::ForcedLittleEndian if host_big_endian => raw.swap_bytes(),
            _ => raw,
        }
    }

    /// Encodes a register value into a raw aperture word. Symmetric with
    /// [`ByteOrder::decode`].
    #[inline]
    pub fn encode(self, value: u32, host_big_endian: bool) -> u32 {
        // A byte swap is its own inverse.
        self.decode(value, host_big_endian)
    }
}

/// Backing store for a GPU control-register aperture.
///
/// `read32`/`write32` move raw 32-bit words at byte offsets; bounds are the
/// caller's responsibility ([`Registers`] enforces them before every call).
/// Reads take `&mut self` because real hardware registers have read side
/// effects (e.g. LUT data ports that auto-increment an index register), and
/// mock backends model those.
pub trait Aperture {
    /// Length of the aperture in bytes.
    fn len(&self) -> u32;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw 32-bit read at `offset`. Caller guarantees `offset + 4 <= len()`.
    fn read32(&mut self, offset: u32) -> u32;

    /// Raw 32-bit write at `offset`. Caller guarantees `offset + 4 <= len()`.
    fn write32(&mut self, offset: u32, value: u32);
}

/// Error type for the `try_*` register access variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("register aperture has been torn down")]
    TornDown,
    #[error("offset 0x{offset:x} outside accessible range [0x{low_limit:x}, 0x{limit:x}]")]
    OutOfRange {
        offset: u32,
        low_limit: u32,
        /// Highest offset at which a full 4-byte access still fits.
        limit: u32,
    },
}

/// Bounds-checked register file over an [`Aperture`].
pub struct Registers<A: Aperture> {
    aperture: A,
    order: ByteOrder,
    /// Lowest offset valid for register access. Normally 0; non-zero when
    /// the start of the BAR is claimed by something other than the display
    /// engine.
    low_limit: u32,
    /// Cleared (release) at teardown, checked (acquire) before every
    /// access. This replaces magic cookie values with a real lifecycle
    /// flag.
    alive: AtomicBool,
}

impl<A: Aperture> Registers<A> {
    pub fn new(aperture: A, order: ByteOrder) -> Self {
        Self::with_low_limit(aperture, order, 0)
    }

    pub fn with_low_limit(aperture: A, order: ByteOrder, low_limit: u32) -> Self {
        Self {
            aperture,
            order,
            low_limit,
            alive: AtomicBool::new(true),
        }
    }

    /// Length of the underlying aperture in bytes.
    pub fn aperture_len(&self) -> u32 {
        self.aperture.len()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn low_limit(&self) -> u32 {
        self.low_limit
    }

    /// Marks the mapping dead. Every subsequent access reads as the
    /// sentinel / no-ops. The underlying aperture is only released when
    /// `self` is dropped.
    pub fn teardown(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    #[inline]
    fn check(&self, offset: u32) -> Result<(), AccessError> {
        if !self.is_alive() {
            return Err(AccessError::TornDown);
        }
        let len = self.aperture.len();
        let limit = len.saturating_sub(4);
        if len < 4 || offset < self.low_limit || offset > limit {
            return Err(AccessError::OutOfRange {
                offset,
                low_limit: self.low_limit,
                limit,
            });
        }
        Ok(())
    }

    /// Reads a 32-bit register. Out-of-range or torn-down access returns
    /// `0`; this is the documented sentinel, not an error condition.
    pub fn read_register(&mut self, offset: u32) -> u32 {
        match self.check(offset) {
            Ok(()) => {
                let raw = self.aperture.read32(offset);
                self.order.decode(raw, cfg!(target_endian = "big"))
            }
            Err(_) => 0,
        }
    }

    /// Writes a 32-bit register, then issues a full bidirectional memory
    /// barrier so the write is observable in program order relative to any
    /// subsequent access. Out-of-range or torn-down access is a silent
    /// no-op.
    pub fn write_register(&mut self, offset: u32, value: u32) {
        if self.check(offset).is_ok() {
            let raw = self.order.encode(value, cfg!(target_endian = "big"));
            self.aperture.write32(offset, raw);
            fence(Ordering::SeqCst);
        }
    }

    /// Like [`Registers::read_register`] but reports why an access was
    /// rejected. For safe-context callers only.
    pub fn try_read_register(&mut self, offset: u32) -> Result<u32, AccessError> {
        self.check(offset)?;
        let raw = self.aperture.read32(offset);
        Ok(self.order.decode(raw, cfg!(target_endian = "big")))
    }

    /// Like [`Registers::write_register`] but reports why an access was
    /// rejected.
    pub fn try_write_register(&mut self, offset: u32, value: u32) -> Result<(), AccessError> {
        self.check(offset)?;
        let raw = self.order.encode(value, cfg!(target_endian = "big"));
        self.aperture.write32(offset, raw);
        fence(Ordering::SeqCst);
        Ok(())
    }

    /// Read-modify-write helper: `reg = (reg & !clear) | set`, as one
    /// locked-scope operation from the caller's point of view.
    pub fn update_register(&mut self, offset: u32, clear: u32, set: u32) {
        let old = self.read_register(offset);
        self.write_register(offset, (old & !clear) | set);
    }

    /// Access to the backing aperture, for test observation.
    pub fn aperture(&self) -> &A {
        &self.aperture
    }

    pub fn aperture_mut(&mut self) -> &mut A {
        &mut self.aperture
    }
}

/// One observed register write, for test assertions about write ordering
/// and atomicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    pub offset: u32,
    pub value: u32,
}

/// Flat in-memory register file.
///
/// Stores raw aperture words (what a device would see on the bus) and keeps
/// a log of every write so tests can assert not just final state but the
/// exact sequence of writes that produced it; the head-synchronizer tests
/// rely on that to prove the restore step is a single register write.
pub struct MockAperture {
    words: Vec<u32>,
    writes: Vec<WriteRecord>,
}

impl MockAperture {
    /// Zero-filled aperture of `len` bytes (rounded down to whole words).
    pub fn new(len: u32) -> Self {
        Self {
            words: vec![0; (len / 4) as usize],
            writes: Vec::new(),
        }
    }

    /// Pre-seeds a register with a raw word value.
    pub fn seed(&mut self, offset: u32, value: u32) {
        let index = (offset / 4) as usize;
        self.words[index] = value;
    }

    /// Raw word currently stored at `offset`.
    pub fn peek(&self, offset: u32) -> u32 {
        self.words[(offset / 4) as usize]
    }

    /// Every write performed since construction (or the last clear), in
    /// order.
    pub fn write_log(&self) -> &[WriteRecord] {
        &self.writes
    }

    pub fn clear_write_log(&mut self) {
        self.writes.clear();
    }
}

impl Aperture for MockAperture {
    fn len(&self) -> u32 {
        (self.words.len() * 4) as u32
    }

    fn read32(&mut self, offset: u32) -> u32 {
        self.words[(offset / 4) as usize]
    }

    fn write32(&mut self, offset: u32, value: u32) {
        self.words[(offset / 4) as usize] = value;
        self.writes.push(WriteRecord { offset, value });
    }
}
