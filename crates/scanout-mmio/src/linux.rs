//! Linux userspace backend: sysfs PCI enumeration and BAR mapping.
//!
//! Display adapters are discovered by scanning `/sys/bus/pci/devices` for
//! class 0x03 (display controller) functions. The control-register aperture
//! is then mapped by `mmap`-ing the matching `resource<N>` file, which
//! requires root (or an equivalent grant on the resource files).

use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;

use crate::Aperture;

const PCI_DEVICES_DIR: &str = "/sys/bus/pci/devices";

/// PCI base class code for display controllers.
const PCI_CLASS_DISPLAY: u32 = 0x03;

/// One discovered display adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Full PCI address, e.g. `0000:01:00.0`.
    pub address: String,
    pub vendor_id: u16,
    pub device_id: u16,
    /// Sizes of the BAR resources, indexed by BAR number; 0 for absent
    /// BARs.
    pub bar_sizes: [u64; 6],
}

impl AdapterInfo {
    fn sysfs_dir(&self) -> PathBuf {
        Path::new(PCI_DEVICES_DIR).join(&self.address)
    }

    /// Maps the register BAR of this adapter.
    pub fn map_bar(&self, bar: usize) -> io::Result<BarMapping> {
        let path = self.sysfs_dir().join(format!("resource{bar}"));
        let len = self.bar_sizes.get(bar).copied().unwrap_or(0);
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: BAR{bar} is not populated", self.address),
            ));
        }
        BarMapping::open(&path, len)
    }
}

fn read_sysfs_hex(dir: &Path, name: &str) -> io::Result<u32> {
    let text = fs::read_to_string(dir.join(name))?;
    let text = text.trim().trim_start_matches("0x");
    u32::from_str_radix(text, 16)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

fn read_bar_sizes(dir: &Path) -> [u64; 6] {
    let mut sizes = [0u64; 6];
    for (bar, size) in sizes.iter_mut().enumerate() {
        if let Ok(meta) = fs::metadata(dir.join(format!("resource{bar}"))) {
            *size = meta.len();
        }
    }
    sizes
}

/// Scans the PCI bus for display controllers, in sysfs (= ascending BDF)
/// order.
pub fn enumerate_display_adapters() -> io::Result<Vec<AdapterInfo>> {
    let mut adapters = Vec::new();
    for entry in fs::read_dir(PCI_DEVICES_DIR)? {
        let entry = entry?;
        let dir = entry.path();
        let class = match read_sysfs_hex(&dir, "class") {
            Ok(c) => c,
            Err(_) => continue,
        };
        if (class >> 16) != PCI_CLASS_DISPLAY {
            continue;
        }
        let vendor_id = read_sysfs_hex(&dir, "vendor")? as u16;
        let device_id = read_sysfs_hex(&dir, "device")? as u16;
        adapters.push(AdapterInfo {
            address: entry.file_name().to_string_lossy().into_owned(),
            vendor_id,
            device_id,
            bar_sizes: read_bar_sizes(&dir),
        });
    }
    adapters.sort_by(|a, b| a.address.cmp(&b.address));
    Ok(adapters)
}

/// A PCI BAR mapped into this process, accessed with volatile 32-bit
/// loads/stores.
pub struct BarMapping {
    base: *mut u8,
    len: u32,
    // Keeps the resource file open for the lifetime of the mapping.
    _file: fs::File,
}

// The raw pointer is only dereferenced through &mut self; callers serialize
// access with their own lock per the crate's concurrency contract.
unsafe impl Send for BarMapping {}

impl BarMapping {
    /// Maps `len` bytes of a sysfs `resourceN` file read-write shared.
    pub fn open(path: &Path, len: u64) -> io::Result<Self> {
        let len = u32::try_from(len).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "BAR larger than 4 GiB")
        })?;
        let file = fs::OpenOptions::new().read(true).write(true).open(path)?;
        // SAFETY: mapping a file we own for its full length; failure is
        // reported via MAP_FAILED.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len as libc::size_t,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            base: base.cast(),
            len,
            _file: file,
        })
    }
}

impl Aperture for BarMapping {
    fn len(&self) -> u32 {
        self.len
    }

    fn read32(&mut self, offset: u32) -> u32 {
        // SAFETY: Registers enforces offset + 4 <= len before calling.
        unsafe { ptr::read_volatile(self.base.add(offset as usize).cast::<u32>()) }
    }

    fn write32(&mut self, offset: u32, value: u32) {
        // SAFETY: as above.
        unsafe { ptr::write_volatile(self.base.add(offset as usize).cast::<u32>(), value) }
    }
}

impl Drop for BarMapping {
    fn drop(&mut self) {
        // SAFETY: base/len came from a successful mmap of exactly this
        // length.
        unsafe {
            libc::munmap(self.base.cast(), self.len as libc::size_t);
        }
    }
}
