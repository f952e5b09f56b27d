mod common;

use std::time::Duration;

use common::*;
use pretty_assertions::assert_eq;
use scanout_core::{GpuError, SyncMethod};
use scanout_regs::amd::{avivo, evergreen as ev};

#[test]
fn master_enable_strategy_restarts_with_a_single_write() {
    let mut device = AvivoDevice::new();
    device.seed(avivo::DC_CRTC_MASTER_EN, 0b11);
    let ctx = single_gpu_context(PCI_ATI, 0x7100, device);

    let outcome = ctx
        .synchronize_heads(&[0, 1], SyncMethod::Auto, Duration::from_secs(5), 1200)
        .unwrap();
    assert!(outcome.within_target);
    assert_eq!(outcome.attempts, 1);

    let master_writes: Vec<u32> = ctx.gpu(0).unwrap().with_registers(|r| {
        r.aperture()
            .write_log()
            .iter()
            .filter(|w| w.offset == avivo::DC_CRTC_MASTER_EN)
            .map(|w| w.value)
            .collect()
    });
    // Heads are stopped one bit at a time; the restart is exactly one
    // write of the original full mask, never per-bit.
    assert_eq!(master_writes, vec![0b10, 0b00, 0b11]);
    let final_mask = ctx
        .gpu(0)
        .unwrap()
        .with_registers(|r| r.aperture().peek(avivo::DC_CRTC_MASTER_EN));
    assert_eq!(final_mask, 0b11);
}

#[test]
fn per_head_strategy_restores_all_controls_back_to_back() {
    let mut device = EvergreenDevice::new();
    let control0 = ev::CRTC_CONTROL + ev::CRTC_REGISTER_OFFSETS[0];
    let control1 = ev::CRTC_CONTROL + ev::CRTC_REGISTER_OFFSETS[1];
    device.seed(control0, ev::CRTC_MASTER_EN | 0x100);
    device.seed(control1, ev::CRTC_MASTER_EN | 0x100);
    let ctx = single_gpu_context(PCI_ATI, 0x6898, device);

    let outcome = ctx
        .synchronize_heads(&[0, 1], SyncMethod::Auto, Duration::from_secs(5), 0)
        .unwrap();
    assert!(outcome.within_target);
    assert_eq!(outcome.residual, 0);

    // Snapshot readback includes the run-state bit; the restore replays it
    // verbatim.
    let snapshot = ev::CRTC_MASTER_EN | ev::CRTC_MASTER_EN_STATE | 0x100;
    let log = ctx
        .gpu(0)
        .unwrap()
        .with_registers(|r| r.aperture().write_log().to_vec());

    let stops: Vec<&scanout_mmio::WriteRecord> = log
        .iter()
        .filter(|w| {
            (w.offset == control0 || w.offset == control1) && w.value & ev::CRTC_MASTER_EN == 0
        })
        .collect();
    assert_eq!(stops.len(), 2);

    // The last two writes of the whole run are the restores, adjacent with
    // nothing interleaved.
    let tail = &log[log.len() - 2..];
    assert_eq!(tail[0].offset, control0);
    assert_eq!(tail[0].value, snapshot);
    assert_eq!(tail[1].offset, control1);
    assert_eq!(tail[1].value, snapshot);
}

#[test]
fn disabled_heads_are_left_alone() {
    let mut device = EvergreenDevice::new();
    let control0 = ev::CRTC_CONTROL + ev::CRTC_REGISTER_OFFSETS[0];
    device.seed(control0, ev::CRTC_MASTER_EN);
    // Head 1 stays disabled.
    let ctx = single_gpu_context(PCI_ATI, 0x6898, device);

    ctx.synchronize_heads(&[0, 1], SyncMethod::Auto, Duration::from_secs(5), 0)
        .unwrap();

    let control1 = ev::CRTC_CONTROL + ev::CRTC_REGISTER_OFFSETS[1];
    let touched = ctx.gpu(0).unwrap().with_registers(|r| {
        r.aperture().write_log().iter().any(|w| w.offset == control1)
    });
    assert!(!touched);
}

#[test]
fn master_enable_ignores_heads_beyond_the_shared_register() {
    // Force the shared-master-enable strategy on a six-head part. Only
    // heads 0 and 1 have bits in the shared register; head 2 must be
    // skipped entirely rather than matched against an empty bit set.
    let mut device = EvergreenDevice::new();
    device.seed(avivo::DC_CRTC_MASTER_EN, 0b11);
    let ctx = single_gpu_context(PCI_ATI, 0x6898, device);

    let outcome = ctx
        .synchronize_heads(
            &[0, 1, 2],
            SyncMethod::MasterEnable,
            Duration::from_secs(5),
            1200,
        )
        .unwrap();
    assert!(outcome.within_target);

    let master_writes: Vec<u32> = ctx.gpu(0).unwrap().with_registers(|r| {
        r.aperture()
            .write_log()
            .iter()
            .filter(|w| w.offset == avivo::DC_CRTC_MASTER_EN)
            .map(|w| w.value)
            .collect()
    });
    // Two per-head stops and the single restore; no third stop for the
    // unrepresentable head.
    assert_eq!(master_writes, vec![0b10, 0b00, 0b11]);
}

#[test]
fn synchronization_fails_fast_on_non_amd_hardware() {
    let ctx = single_gpu_context(PCI_NVIDIA, 0x1234, NvDevice::new(0x0C00_0020));
    assert!(matches!(
        ctx.synchronize_heads(&[0], SyncMethod::Auto, Duration::from_secs(1), 0),
        Err(GpuError::Unsupported)
    ));
}

#[test]
fn duplicate_screens_resolve_to_one_head() {
    let mut device = EvergreenDevice::new();
    let control0 = ev::CRTC_CONTROL + ev::CRTC_REGISTER_OFFSETS[0];
    device.seed(control0, ev::CRTC_MASTER_EN);
    let ctx = single_gpu_context(PCI_ATI, 0x6898, device);
    // Both screens map to head 0.
    ctx.set_screen_to_head(1, 0, 0);

    ctx.synchronize_heads(&[0, 1], SyncMethod::Auto, Duration::from_secs(5), 0)
        .unwrap();

    let stops = ctx.gpu(0).unwrap().with_registers(|r| {
        r.aperture()
            .write_log()
            .iter()
            .filter(|w| w.offset == control0 && w.value & ev::CRTC_MASTER_EN == 0)
            .count()
    });
    assert_eq!(stops, 1);
}
