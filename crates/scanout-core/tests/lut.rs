mod common;

use common::*;
use pretty_assertions::assert_eq;
use scanout_core::{GpuError, LutState};
use scanout_regs::amd::{avivo, evergreen as ev, identity_lut_slot};

#[test]
fn fresh_lut_classifies_as_all_zero() {
    let ctx = single_gpu_context(PCI_ATI, 0x6898, EvergreenDevice::new());
    assert_eq!(ctx.lut_state(0, false).unwrap(), LutState::AllZero);
}

#[test]
fn loaded_identity_ramp_reads_back_as_identity() {
    let ctx = single_gpu_context(PCI_ATI, 0x6898, EvergreenDevice::new());

    ctx.load_identity_lut(3).unwrap();
    assert_eq!(ctx.lut_state(3, false).unwrap(), LutState::Identity);
    // Other heads untouched.
    assert_eq!(ctx.lut_state(0, false).unwrap(), LutState::AllZero);
}

#[test]
fn non_neutral_offsets_demote_identity() {
    let ctx = single_gpu_context(PCI_ATI, 0x6898, EvergreenDevice::new());
    ctx.load_identity_lut(0).unwrap();

    let white_green = ev::DC_LUT_WHITE_OFFSET_GREEN + ev::CRTC_REGISTER_OFFSETS[0];
    ctx.write_register(white_green, 0xCCCC).unwrap();
    assert_eq!(
        ctx.lut_state(0, false).unwrap(),
        LutState::IdentityWithOffsets
    );
}

#[test]
fn one_wrong_slot_makes_the_table_arbitrary() {
    let mut device = EvergreenDevice::new();
    for slot in 0..256 {
        device.seed_lut(0, slot as usize, identity_lut_slot(slot));
    }
    device.seed_lut(0, 128, identity_lut_slot(128) ^ 1);
    // Neutral offsets, so only the slot mismatch decides.
    let off = ev::CRTC_REGISTER_OFFSETS[0];
    device.seed(ev::DC_LUT_WHITE_OFFSET_RED + off, 0xFFFF);
    device.seed(ev::DC_LUT_WHITE_OFFSET_GREEN + off, 0xFFFF);
    device.seed(ev::DC_LUT_WHITE_OFFSET_BLUE + off, 0xFFFF);
    let ctx = single_gpu_context(PCI_ATI, 0x6898, device);

    assert_eq!(ctx.lut_state(0, false).unwrap(), LutState::Arbitrary);
}

#[test]
fn undefined_readback_bits_are_ignored() {
    let mut device = EvergreenDevice::new();
    for slot in 0..256 {
        // Hardware leaves the top two bits undefined on readback.
        device.seed_lut(0, slot as usize, identity_lut_slot(slot) | 0xC000_0000);
    }
    let off = ev::CRTC_REGISTER_OFFSETS[0];
    device.seed(ev::DC_LUT_WHITE_OFFSET_RED + off, 0xFFFF);
    device.seed(ev::DC_LUT_WHITE_OFFSET_GREEN + off, 0xFFFF);
    device.seed(ev::DC_LUT_WHITE_OFFSET_BLUE + off, 0xFFFF);
    let ctx = single_gpu_context(PCI_ATI, 0x6898, device);

    assert_eq!(ctx.lut_state(0, false).unwrap(), LutState::Identity);
}

#[test]
fn dce5_identity_load_bypasses_the_aux_color_stages() {
    // 0x6700 classifies as DCE-5.
    let ctx = single_gpu_context(PCI_ATI, 0x6700, EvergreenDevice::new());
    ctx.load_identity_lut(0).unwrap();

    let gpu = ctx.gpu(0).unwrap();
    let off = ev::CRTC_REGISTER_OFFSETS[0];
    let peek = |reg: u32| gpu.with_registers(|r| r.aperture().peek(reg + off));
    assert_eq!(peek(ev::PRESCALE_GRPH_CONTROL), ev::GRPH_PRESCALE_BYPASS);
    assert_eq!(peek(ev::PRESCALE_OVL_CONTROL), ev::OVL_PRESCALE_BYPASS);
    assert_eq!(peek(ev::DEGAMMA_CONTROL), 0);
    assert_eq!(peek(ev::GAMUT_REMAP_CONTROL), 0);
    assert_eq!(peek(ev::REGAMMA_CONTROL), 0);
    assert_eq!(peek(ev::OUTPUT_CSC_CONTROL), 0);
}

#[test]
fn dce41_identity_load_also_bypasses_the_aux_stages() {
    // 0x9802 classifies as DCE-4.1: the first generation carrying the aux
    // stages, ordered below DCE-5.
    let ctx = single_gpu_context(PCI_ATI, 0x9802, EvergreenDevice::new());
    ctx.load_identity_lut(0).unwrap();

    let touched = ctx.gpu(0).unwrap().with_registers(|r| {
        r.aperture()
            .write_log()
            .iter()
            .any(|w| w.offset == ev::REGAMMA_CONTROL + ev::CRTC_REGISTER_OFFSETS[0])
    });
    assert!(touched);
}

#[test]
fn dce4_identity_load_leaves_aux_stages_alone() {
    let ctx = single_gpu_context(PCI_ATI, 0x6898, EvergreenDevice::new());
    ctx.load_identity_lut(0).unwrap();

    let touched = ctx.gpu(0).unwrap().with_registers(|r| {
        r.aperture()
            .write_log()
            .iter()
            .any(|w| w.offset == ev::REGAMMA_CONTROL + ev::CRTC_REGISTER_OFFSETS[0])
    });
    assert!(!touched);
}

#[test]
fn avivo_palettes_are_selected_through_the_shared_port() {
    let ctx = single_gpu_context(PCI_ATI, 0x7100, AvivoDevice::new());

    ctx.load_identity_lut(1).unwrap();
    assert_eq!(ctx.lut_state(1, false).unwrap(), LutState::Identity);
    assert_eq!(ctx.lut_state(0, false).unwrap(), LutState::AllZero);

    let selects = ctx.gpu(0).unwrap().with_registers(|r| {
        r.aperture()
            .write_log()
            .iter()
            .filter(|w| w.offset == avivo::DC_LUT_RW_SELECT)
            .map(|w| w.value)
            .collect::<Vec<u32>>()
    });
    assert!(selects.contains(&1));
}

#[test]
fn lut_queries_are_unsupported_on_foreign_gpus() {
    let ctx = single_gpu_context(PCI_NVIDIA, 0x1234, NvDevice::new(0x0C00_0020));
    assert!(matches!(ctx.lut_state(0, false), Err(GpuError::Unsupported)));
    assert!(matches!(ctx.load_identity_lut(0), Err(GpuError::Unsupported)));
}

#[test]
fn invalid_head_is_rejected_before_touching_registers() {
    let ctx = single_gpu_context(PCI_ATI, 0x6898, EvergreenDevice::new());
    assert!(matches!(
        ctx.lut_state(6, false),
        Err(GpuError::InvalidHead { head: 6, count: 6 })
    ));
    let writes = ctx
        .gpu(0)
        .unwrap()
        .with_registers(|r| r.aperture().write_log().len());
    assert_eq!(writes, 0);
}

#[test]
fn dither_disable_caches_and_reenable_restores() {
    let mut device = AvivoDevice::new();
    // TMDS encoder active, dither configured to 0x105.
    device.seed(avivo::TMDSA_CNTL, 0x1);
    device.seed(avivo::TMDSA_BIT_DEPTH_CONTROL, 0x105);
    let ctx = single_gpu_context(PCI_ATI, 0x7100, device);

    ctx.set_dither_mode(0, 0).unwrap();
    let gpu = ctx.gpu(0).unwrap();
    assert_eq!(
        gpu.with_registers(|r| r.aperture().peek(avivo::TMDSA_BIT_DEPTH_CONTROL)),
        0
    );

    // Re-enable restores the cached 0x105, not the caller's raw value.
    ctx.set_dither_mode(0, 2).unwrap();
    assert_eq!(
        gpu.with_registers(|r| r.aperture().peek(avivo::TMDSA_BIT_DEPTH_CONTROL)),
        0x105
    );
}

#[test]
fn dither_enable_without_cache_writes_the_raw_value() {
    let ctx = single_gpu_context(PCI_ATI, 0x6898, EvergreenDevice::new());

    ctx.set_dither_mode(2, 0x77).unwrap();
    let reg = ev::FMT_BIT_DEPTH_CONTROL + ev::CRTC_REGISTER_OFFSETS[2];
    assert_eq!(
        ctx.gpu(0).unwrap().with_registers(|r| r.aperture().peek(reg)),
        0x77
    );
}

#[test]
fn dither_on_analog_only_avivo_head_is_a_no_op() {
    // No encoder CNTL bit set: analog output, nothing to dither.
    let ctx = single_gpu_context(PCI_ATI, 0x7100, AvivoDevice::new());
    ctx.set_dither_mode(0, 0).unwrap();
    let writes = ctx
        .gpu(0)
        .unwrap()
        .with_registers(|r| r.aperture().write_log().len());
    assert_eq!(writes, 0);
}
