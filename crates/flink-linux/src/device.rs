//! Linux flink device implementation

use crate::error::{LinuxFlinkError, Result};
use crate::registry::{DeviceClaim, DeviceRegistry};
use flink_core::error::{Error as CoreError, NotFound, Result as CoreResult};
use flink_core::{FlinkBus, FunctionId, Subdevice};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// flink driver ioctl requests
///
/// The flink driver uses plain request numbers rather than `_IOC`
/// encoded ones, hence the `_bad` variants of the nix macros.
mod ioctl {
    use nix::{ioctl_read_bad, ioctl_readwrite_bad, ioctl_write_ptr_bad};

    pub const SELECT_SUBDEVICE: u32 = 0x10;
    pub const SELECT_SUBDEVICE_EXCL: u32 = 0x11;
    pub const READ_NOF_SUBDEVICES: u32 = 0x20;
    pub const READ_SUBDEVICE_INFO: u32 = 0x21;
    pub const SELECT_AND_READ_BIT: u32 = 0x40;
    pub const SELECT_AND_WRITE_BIT: u32 = 0x41;

    /// Argument of the single bit requests
    /// Matches struct ioctl_bit_container_t of the flink driver
    #[repr(C)]
    #[derive(Debug, Default, Clone, Copy)]
    pub struct BitContainer {
        pub offset: u32,
        pub bit: u8,
        pub value: u8,
        pub subdevice: u8,
    }

    /// Subdevice description filled in by READ_SUBDEVICE_INFO
    /// Matches the user visible part of struct flink_subdevice
    #[repr(C)]
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SubdeviceInfo {
        pub id: u8,
        pub function_id: u16,
        pub sub_function_id: u8,
        pub function_version: u8,
        pub base_addr: u32,
        pub mem_size: u32,
        pub nof_channels: u32,
        pub unique_id: u32,
    }

    ioctl_write_ptr_bad!(select_subdevice, SELECT_SUBDEVICE, u8);
    ioctl_write_ptr_bad!(select_subdevice_excl, SELECT_SUBDEVICE_EXCL, u8);
    ioctl_read_bad!(read_nof_subdevices, READ_NOF_SUBDEVICES, u8);
    ioctl_readwrite_bad!(read_subdevice_info, READ_SUBDEVICE_INFO, SubdeviceInfo);
    ioctl_readwrite_bad!(select_and_read_bit, SELECT_AND_READ_BIT, BitContainer);
    ioctl_write_ptr_bad!(select_and_write_bit, SELECT_AND_WRITE_BIT, BitContainer);
}

/// Configuration for opening a Linux flink device
#[derive(Debug, Clone, Default)]
pub struct LinuxFlinkConfig {
    /// Device path (e.g., "/dev/flink0")
    pub device: PathBuf,
    /// Select subdevices exclusively, blocking other processes
    pub exclusive: bool,
}

impl LinuxFlinkConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Select subdevices exclusively
    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }
}

/// Linux flink device using the `/dev/flinkN` interface
///
/// Register data is transferred with positioned reads and writes after
/// selecting the subdevice; single bits go through the driver's combined
/// select-and-access requests. The subdevice list is read once at open.
pub struct LinuxFlink {
    file: File,
    subdevices: Vec<Subdevice>,
    selected: Option<u8>,
    exclusive: bool,
    claim: DeviceClaim,
}

impl LinuxFlink {
    /// Open a flink device, claiming its path in `registry`
    pub fn open(config: &LinuxFlinkConfig, registry: &DeviceRegistry) -> Result<Self> {
        if config.device.as_os_str().is_empty() {
            return Err(LinuxFlinkError::NoDevice);
        }
        let path = config.device.as_path();
        log::debug!("linux_flink: Opening device {}", path.display());

        let claim = registry.claim(path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| LinuxFlinkError::OpenFailed {
                path: path.display().to_string(),
                source: e,
            })?;

        let subdevices = read_subdevices(&file)?;
        log::info!(
            "linux_flink: Opened {} ({} subdevices{})",
            path.display(),
            subdevices.len(),
            if config.exclusive { ", exclusive" } else { "" }
        );

        Ok(Self {
            file,
            subdevices,
            selected: None,
            exclusive: config.exclusive,
            claim,
        })
    }

    /// Open a device with default settings
    pub fn open_device(device: &str, registry: &DeviceRegistry) -> Result<Self> {
        Self::open(&LinuxFlinkConfig::new(device), registry)
    }

    /// Path of the opened device
    pub fn path(&self) -> &Path {
        self.claim.path()
    }

    fn ensure_selected(&mut self, subdevice: u8, offset: u32) -> CoreResult<()> {
        if self.selected == Some(subdevice) {
            return Ok(());
        }
        if subdevice as usize >= self.subdevices.len() {
            return Err(NotFound::Id(subdevice).into());
        }
        let fd = self.file.as_raw_fd();
        // SAFETY: fd is an open flink device and the argument outlives the call
        let ret = unsafe {
            if self.exclusive {
                ioctl::select_subdevice_excl(fd, &subdevice)
            } else {
                ioctl::select_subdevice(fd, &subdevice)
            }
        };
        ret.map_err(|e| errno_error(subdevice, offset, e))?;
        self.selected = Some(subdevice);
        Ok(())
    }
}

fn read_subdevices(file: &File) -> Result<Vec<Subdevice>> {
    let fd = file.as_raw_fd();
    let mut count: u8 = 0;
    // SAFETY: fd is open and count is a valid u8 the driver writes to
    unsafe { ioctl::read_nof_subdevices(fd, &mut count) }.map_err(|e| {
        LinuxFlinkError::Ioctl {
            request: "READ_NOF_SUBDEVICES",
            source: e,
        }
    })?;

    let mut subdevices = Vec::with_capacity(count as usize);
    for id in 0..count {
        let mut info = ioctl::SubdeviceInfo {
            id,
            ..Default::default()
        };
        // SAFETY: info is a properly laid out SubdeviceInfo owned by us
        unsafe { ioctl::read_subdevice_info(fd, &mut info) }.map_err(|e| {
            LinuxFlinkError::Ioctl {
                request: "READ_SUBDEVICE_INFO",
                source: e,
            }
        })?;
        let sub = subdevice_from_info(&info);
        log::debug!(
            "linux_flink: subdevice {}: {} at 0x{:08X} (0x{:X} bytes)",
            sub.id,
            sub.function,
            sub.base_addr,
            sub.mem_size
        );
        subdevices.push(sub);
    }
    Ok(subdevices)
}

fn subdevice_from_info(info: &ioctl::SubdeviceInfo) -> Subdevice {
    Subdevice {
        id: info.id,
        function: FunctionId::from_raw(info.function_id),
        subtype: info.sub_function_id,
        version: info.function_version,
        base_addr: info.base_addr,
        mem_size: info.mem_size,
        channels: info.nof_channels,
        unique_id: info.unique_id,
    }
}

fn errno_error(subdevice: u8, offset: u32, errno: nix::errno::Errno) -> CoreError {
    CoreError::Transport {
        subdevice,
        offset,
        code: -(errno as i32),
    }
}

fn io_error(subdevice: u8, offset: u32, err: std::io::Error) -> CoreError {
    CoreError::Transport {
        subdevice,
        offset,
        code: -err.raw_os_error().unwrap_or(libc::EIO),
    }
}

impl FlinkBus for LinuxFlink {
    fn subdevice_count(&mut self) -> CoreResult<u8> {
        Ok(self.subdevices.len() as u8)
    }

    fn subdevice_info(&mut self, id: u8) -> CoreResult<Subdevice> {
        self.subdevices
            .get(id as usize)
            .copied()
            .ok_or(CoreError::NotFound(NotFound::Id(id)))
    }

    fn read(&mut self, subdevice: u8, offset: u32, buf: &mut [u8]) -> CoreResult<()> {
        self.ensure_selected(subdevice, offset)?;
        self.file
            .read_exact_at(buf, offset as u64)
            .map_err(|e| io_error(subdevice, offset, e))
    }

    fn write(&mut self, subdevice: u8, offset: u32, data: &[u8]) -> CoreResult<()> {
        self.ensure_selected(subdevice, offset)?;
        self.file
            .write_all_at(data, offset as u64)
            .map_err(|e| io_error(subdevice, offset, e))
    }

    fn read_bit(&mut self, subdevice: u8, offset: u32, bit: u8) -> CoreResult<bool> {
        let mut container = ioctl::BitContainer {
            offset,
            bit,
            value: 0,
            subdevice,
        };
        // SAFETY: container is a properly laid out BitContainer owned by us
        unsafe { ioctl::select_and_read_bit(self.file.as_raw_fd(), &mut container) }
            .map_err(|e| errno_error(subdevice, offset, e))?;
        self.selected = Some(subdevice);
        Ok(container.value != 0)
    }

    fn write_bit(&mut self, subdevice: u8, offset: u32, bit: u8, value: bool) -> CoreResult<()> {
        let container = ioctl::BitContainer {
            offset,
            bit,
            value: value as u8,
            subdevice,
        };
        // SAFETY: container is a properly laid out BitContainer owned by us
        unsafe { ioctl::select_and_write_bit(self.file.as_raw_fd(), &container) }
            .map_err(|e| errno_error(subdevice, offset, e))?;
        self.selected = Some(subdevice);
        Ok(())
    }

    fn select(&mut self, subdevice: u8, exclusive: bool) -> CoreResult<()> {
        self.exclusive = exclusive;
        self.selected = None;
        self.ensure_selected(subdevice, 0)
    }
}

/// Parse backend options from key-value pairs
///
/// # Supported options
/// - `dev=PATH` - flink device file (required)
/// - `exclusive=0|1` - select subdevices exclusively
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxFlinkConfig> {
    let mut config = LinuxFlinkConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = PathBuf::from(value);
            }
            "exclusive" => {
                config.exclusive = match *value {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    _ => {
                        return Err(LinuxFlinkError::InvalidParameter {
                            name: "exclusive",
                            message: format!("'{}' is not a boolean", value),
                        })
                    }
                };
            }
            _ => {
                log::warn!("linux_flink: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.as_os_str().is_empty() {
        return Err(LinuxFlinkError::NoDevice);
    }

    Ok(config)
}
