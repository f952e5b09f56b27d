//! Mock GPU devices with enough register semantics for the integration
//! tests: LUT data ports that auto-increment their index, CRTC run-state
//! readback that follows the enable bit, and raster counters that advance
//! on every read so the synchronizer's polls terminate.

#![allow(dead_code)]

use scanout_core::{Config, DisplayContext, GpuDescriptor, GpuInstance};
use scanout_mmio::{Aperture, Registers, WriteRecord};
use scanout_regs::amd::evergreen as ev;
use scanout_regs::amd::{avivo, LUT_SLOT_COUNT};
use scanout_regs::Vendor;

pub const PCI_ATI: u16 = 0x1002;
pub const PCI_NVIDIA: u16 = 0x10DE;

/// DCE-4+ display block: six CRTCs, per-CRTC LUT.
pub struct EvergreenDevice {
    words: Vec<u32>,
    lut: [[u32; LUT_SLOT_COUNT as usize]; 6],
    lut_index: [usize; 6],
    writes: Vec<WriteRecord>,
}

impl EvergreenDevice {
    pub const LEN: u32 = 0x2_0000;

    pub fn new() -> Self {
        Self {
            words: vec![0; (Self::LEN / 4) as usize],
            lut: [[0; LUT_SLOT_COUNT as usize]; 6],
            lut_index: [0; 6],
            writes: Vec::new(),
        }
    }

    pub fn seed(&mut self, offset: u32, value: u32) {
        self.words[(offset / 4) as usize] = value;
    }

    pub fn peek(&self, offset: u32) -> u32 {
        self.words[(offset / 4) as usize]
    }

    pub fn seed_lut(&mut self, head: usize, slot: usize, value: u32) {
        self.lut[head][slot] = value;
    }

    pub fn write_log(&self) -> &[WriteRecord] {
        &self.writes
    }

    /// Seeds a CRTC with a plausible 1125-line video mode.
    pub fn seed_mode(&mut self, head: usize, vtotal: u32, vblank_end: u32, position: u32) {
        let off = ev::CRTC_REGISTER_OFFSETS[head];
        self.seed(ev::CRTC_V_TOTAL + off, vtotal - 1);
        self.seed(ev::CRTC_V_BLANK_START_END + off, vblank_end << 16);
        self.seed(ev::CRTC_STATUS_POSITION + off, position);
    }

    fn head_of(offset: u32, reg: u32) -> Option<usize> {
        ev::CRTC_REGISTER_OFFSETS
            .iter()
            .position(|&off| offset == reg + off)
    }
}

impl Aperture for EvergreenDevice {
    fn len(&self) -> u32 {
        Self::LEN
    }

    fn read32(&mut self, offset: u32) -> u32 {
        if let Some(head) = Self::head_of(offset, ev::DC_LUT_30_COLOR) {
            let slot = self.lut_index[head];
            self.lut_index[head] = (slot + 1) % LUT_SLOT_COUNT as usize;
            return self.lut[head][slot];
        }
        if Self::head_of(offset, ev::CRTC_CONTROL).is_some() {
            // Run-state readback tracks the enable bit immediately.
            let stored = self.words[(offset / 4) as usize];
            let state = if stored & ev::CRTC_MASTER_EN != 0 {
                ev::CRTC_MASTER_EN_STATE
            } else {
                0
            };
            return (stored & !ev::CRTC_MASTER_EN_STATE) | state;
        }
        self.words[(offset / 4) as usize]
    }

    fn write32(&mut self, offset: u32, value: u32) {
        self.writes.push(WriteRecord { offset, value });
        if let Some(head) = Self::head_of(offset, ev::DC_LUT_RW_INDEX) {
            self.lut_index[head] = (value & 0xFF) as usize;
            return;
        }
        if let Some(head) = Self::head_of(offset, ev::DC_LUT_30_COLOR) {
            let slot = self.lut_index[head];
            self.lut_index[head] = (slot + 1) % LUT_SLOT_COUNT as usize;
            self.lut[head][slot] = value;
            return;
        }
        self.words[(offset / 4) as usize] = value;
    }
}

/// AVIVO display block: two CRTCs, one LUT access port multiplexed over
/// both palettes, raster counters that advance on every status read.
pub struct AvivoDevice {
    words: Vec<u32>,
    lut: [[u32; LUT_SLOT_COUNT as usize]; 2],
    lut_index: usize,
    selected: usize,
    raster: [u32; 2],
    writes: Vec<WriteRecord>,
}

impl AvivoDevice {
    pub const LEN: u32 = 0x8000;
    /// Scanlines the raster counter advances per status read. Coprime with
    /// the mode's total so the counter visits both sides of any threshold.
    const RASTER_STEP: u32 = 97;
    const VTOTAL: u32 = 1125;

    pub fn new() -> Self {
        let mut device = Self {
            words: vec![0; (Self::LEN / 4) as usize],
            lut: [[0; LUT_SLOT_COUNT as usize]; 2],
            lut_index: 0,
            selected: 0,
            raster: [0, 560],
            writes: Vec::new(),
        };
        for head in 0..avivo::CRTC_COUNT as u32 {
            device.seed(
                avivo::D1CRTC_V_TOTAL + head * avivo::CRTC_BLOCK_STRIDE,
                Self::VTOTAL - 1,
            );
        }
        device
    }

    pub fn seed(&mut self, offset: u32, value: u32) {
        self.words[(offset / 4) as usize] = value;
    }

    pub fn peek(&self, offset: u32) -> u32 {
        self.words[(offset / 4) as usize]
    }

    pub fn write_log(&self) -> &[WriteRecord] {
        &self.writes
    }

    fn raster_head(offset: u32) -> Option<usize> {
        (0..avivo::CRTC_COUNT)
            .find(|&h| offset == avivo::D1CRTC_STATUS_POSITION + h as u32 * avivo::CRTC_BLOCK_STRIDE)
    }
}

impl Aperture for AvivoDevice {
    fn len(&self) -> u32 {
        Self::LEN
    }

    fn read32(&mut self, offset: u32) -> u32 {
        if let Some(head) = Self::raster_head(offset) {
            self.raster[head] = (self.raster[head] + Self::RASTER_STEP) % Self::VTOTAL;
            return self.raster[head];
        }
        if offset == avivo::DC_LUT_30_COLOR {
            let slot = self.lut_index;
            self.lut_index = (slot + 1) % LUT_SLOT_COUNT as usize;
            return self.lut[self.selected][slot];
        }
        self.words[(offset / 4) as usize]
    }

    fn write32(&mut self, offset: u32, value: u32) {
        self.writes.push(WriteRecord { offset, value });
        match offset {
            avivo::DC_LUT_RW_SELECT => self.selected = (value & 1) as usize,
            avivo::DC_LUT_RW_INDEX => self.lut_index = (value & 0xFF) as usize,
            avivo::DC_LUT_30_COLOR => {
                let slot = self.lut_index;
                self.lut_index = (slot + 1) % LUT_SLOT_COUNT as usize;
                self.lut[self.selected][slot] = value;
            }
            _ => self.words[(offset / 4) as usize] = value,
        }
    }
}

/// Flat NVIDIA aperture big enough to cover the NV50 raster registers.
pub struct NvDevice {
    words: Vec<u32>,
}

impl NvDevice {
    pub const LEN: u32 = 0x62_0000;

    pub fn new(boot0: u32) -> Self {
        let mut device = Self {
            words: vec![0; (Self::LEN / 4) as usize],
        };
        device.seed(scanout_regs::nvidia::PMC_BOOT_0, boot0);
        device
    }

    pub fn seed(&mut self, offset: u32, value: u32) {
        self.words[(offset / 4) as usize] = value;
    }
}

impl Aperture for NvDevice {
    fn len(&self) -> u32 {
        Self::LEN
    }

    fn read32(&mut self, offset: u32) -> u32 {
        self.words[(offset / 4) as usize]
    }

    fn write32(&mut self, offset: u32, value: u32) {
        self.words[(offset / 4) as usize] = value;
    }
}

pub fn gpu_instance<A: Aperture>(vendor_id: u16, device_id: u16, device: A) -> GpuInstance<A> {
    let vendor = Vendor::from_pci_vendor_id(vendor_id);
    let mut regs = Registers::new(device, GpuDescriptor::byte_order(vendor));
    let descriptor = GpuDescriptor::probe(vendor_id, device_id, &mut regs, false);
    GpuInstance::new(descriptor, regs)
}

pub fn single_gpu_context<A: Aperture>(
    vendor_id: u16,
    device_id: u16,
    device: A,
) -> DisplayContext<A> {
    context_with_config(vendor_id, device_id, device, Config::default())
}

pub fn context_with_config<A: Aperture>(
    vendor_id: u16,
    device_id: u16,
    device: A,
    config: Config,
) -> DisplayContext<A> {
    DisplayContext::new(vec![gpu_instance(vendor_id, device_id, device)], config).unwrap()
}
