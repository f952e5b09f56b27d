//! `scanout`: command-line frontend for low-level display scanout control.
//!
//! Maps the control-register BARs of every display adapter on the PCI bus
//! (root required) and exposes the library operations as subcommands:
//! identity/classification, beamposition queries, display-head
//! synchronization, LUT and dither control, and raw register peek/poke.

// The library crates are portable; the PCI/sysfs backend is Linux-only.
#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("scanout: this tool requires Linux (sysfs PCI BAR access)");
    std::process::exit(1);
}

#[cfg(target_os = "linux")]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_os = "linux")]
mod native {
    use std::time::Duration;

    use anyhow::{bail, Context, Result};
    use clap::{Parser, Subcommand, ValueEnum};
    use scanout_core::{
        Config, DisplayContext, GpuDescriptor, GpuInstance, SyncMethod,
    };
    use scanout_mmio::linux::{enumerate_display_adapters, BarMapping};
    use scanout_mmio::Registers;
    use scanout_regs::Vendor;
    use tracing_subscriber::EnvFilter;

    #[derive(Debug, Parser)]
    #[command(name = "scanout", about = "Low-level display scanout control", version)]
    struct Args {
        #[command(subcommand)]
        command: Cmd,
    }

    #[derive(Debug, Subcommand)]
    enum Cmd {
        /// List detected adapters and their classification.
        Info,
        /// Query the current beamposition of a logical screen.
        Beampos {
            #[arg(default_value_t = 0)]
            screen: usize,
            /// Number of consecutive samples to print.
            #[arg(long, default_value_t = 1)]
            samples: u32,
        },
        /// Phase-align the refresh cycles of the given screens. Blocks for
        /// several seconds.
        Sync {
            /// Logical screens to align (at least two for a useful result).
            #[arg(required = true)]
            screens: Vec<usize>,
            #[arg(long, value_enum, default_value_t = MethodArg::Auto)]
            method: MethodArg,
            /// Give up after this many seconds above the residual target.
            #[arg(long, default_value_t = 30)]
            timeout_secs: u64,
            /// Acceptable residual offset in scanlines.
            #[arg(long, default_value_t = 2)]
            residual: u32,
        },
        /// Classify the hardware gamma LUT of a head.
        LutState {
            #[arg(default_value_t = 0)]
            head: usize,
            /// Log every slot readback.
            #[arg(long)]
            debug: bool,
        },
        /// Load a passthrough identity LUT into a head.
        LutIdentity {
            #[arg(default_value_t = 0)]
            head: usize,
        },
        /// Disable (value 0) or re-enable digital-output dithering.
        Dither { screen: usize, value: u32 },
        /// Read a raw 32-bit register of the active GPU.
        Peek {
            #[arg(value_parser = parse_hex)]
            offset: u32,
        },
        /// Write a raw 32-bit register of the active GPU.
        Poke {
            #[arg(value_parser = parse_hex)]
            offset: u32,
            #[arg(value_parser = parse_hex)]
            value: u32,
        },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    enum MethodArg {
        Auto,
        MasterEnable,
        PerHead,
    }

    impl From<MethodArg> for SyncMethod {
        fn from(arg: MethodArg) -> Self {
            match arg {
                MethodArg::Auto => SyncMethod::Auto,
                MethodArg::MasterEnable => SyncMethod::MasterEnable,
                MethodArg::PerHead => SyncMethod::PerHead,
            }
        }
    }

    fn parse_hex(s: &str) -> Result<u32, String> {
        let t = s.trim();
        let (radix, digits) = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
            Some(rest) => (16, rest),
            None => (10, t),
        };
        u32::from_str_radix(digits, radix).map_err(|e| e.to_string())
    }

    /// Register BAR per vendor: Radeon parts put the control registers in
    /// BAR 2, NVIDIA and Intel in BAR 0.
    fn register_bar(vendor: Vendor) -> usize {
        match vendor {
            Vendor::Amd => 2,
            _ => 0,
        }
    }

    fn build_context() -> Result<DisplayContext<BarMapping>> {
        let config = Config::from_env();
        let adapters = enumerate_display_adapters()
            .context("scanning /sys/bus/pci/devices for display adapters")?;
        if adapters.is_empty() {
            bail!("no display adapters found on the PCI bus");
        }

        let mut gpus = Vec::new();
        for adapter in &adapters {
            let vendor = Vendor::from_pci_vendor_id(adapter.vendor_id);
            let bar = register_bar(vendor);
            let mapping = match adapter.map_bar(bar) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(
                        address = %adapter.address,
                        bar,
                        error = %e,
                        "could not map register BAR, skipping adapter (root required)"
                    );
                    continue;
                }
            };
            let mut regs = Registers::new(mapping, GpuDescriptor::byte_order(vendor));
            let descriptor = GpuDescriptor::probe(
                adapter.vendor_id,
                adapter.device_id,
                &mut regs,
                config.allow_unsafe_gpus,
            );
            tracing::debug!(
                address = %adapter.address,
                vendor = %descriptor.vendor,
                device_id = format_args!("0x{:04x}", descriptor.device_id),
                heads = descriptor.head_count,
                "mapped display adapter"
            );
            gpus.push(GpuInstance::new(descriptor, regs));
        }
        if gpus.is_empty() {
            bail!("no adapter could be mapped; run as root");
        }

        DisplayContext::new(gpus, config).context("building the display context")
    }

    pub fn run() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
        let args = Args::parse();
        let ctx = build_context()?;

        match args.command {
            Cmd::Info => {
                for index in 0..ctx.gpu_count() {
                    let gpu = ctx.gpu(index).expect("index in range");
                    let info = gpu.descriptor.info();
                    let marker = if index == ctx.active_index() { "*" } else { " " };
                    println!(
                        "{marker} GPU {index}: {} 0x{:04x}, {}, {} heads, {} KiB aperture",
                        info.vendor,
                        info.device_id,
                        info.generation,
                        info.head_count,
                        info.aperture_len / 1024,
                    );
                }
            }
            Cmd::Beampos { screen, samples } => {
                for _ in 0..samples {
                    println!("{}", ctx.beam_position(screen));
                }
            }
            Cmd::Sync {
                screens,
                method,
                timeout_secs,
                residual,
            } => {
                let outcome = ctx.synchronize_heads(
                    &screens,
                    method.into(),
                    Duration::from_secs(timeout_secs),
                    residual,
                )?;
                println!(
                    "residual {} scanlines after {} attempt(s){}",
                    outcome.residual,
                    outcome.attempts,
                    if outcome.within_target {
                        ""
                    } else {
                        " (target not met)"
                    },
                );
                if !outcome.within_target {
                    std::process::exit(2);
                }
            }
            Cmd::LutState { head, debug } => {
                let state = ctx.lut_state(head, debug)?;
                println!("{state:?} (code {})", state.code());
            }
            Cmd::LutIdentity { head } => {
                ctx.load_identity_lut(head)?;
                println!("identity LUT loaded on head {head}");
            }
            Cmd::Dither { screen, value } => {
                let head = usize::try_from(ctx.screen_to_head(screen, 0))
                    .map_err(|_| anyhow::anyhow!("screen {screen} has no mapped output"))?;
                ctx.set_dither_mode(head, value)?;
            }
            Cmd::Peek { offset } => {
                println!("0x{:08x}", ctx.read_register(offset)?);
            }
            Cmd::Poke { offset, value } => {
                ctx.write_register(offset, value)?;
            }
        }

        ctx.teardown();
        Ok(())
    }
}
