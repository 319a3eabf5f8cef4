//! Linux MTD storage device implementation

use crate::error::{LinuxMtdError, Result};
use bitflags::bitflags;
use fwflash_core::storage::{AccessMode, Partition, PartitionInfo, StorageDevice};
use log::{debug, info, trace, warn};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::RangeInclusive;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

/// Default sysfs class directory for MTD devices
pub const MTD_SYSFS_ROOT: &str = "/sys/class/mtd";

/// Default directory holding the MTD device nodes
pub const DEV_ROOT: &str = "/dev";

bitflags! {
    /// MTD flags from kernel headers (mtd/mtd-abi.h)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MtdFlags: u64 {
        /// Device is writable
        const WRITEABLE = 0x400;
        /// Single bits can be flipped
        const BIT_WRITEABLE = 0x800;
        /// Device doesn't require erase before write
        const NO_ERASE = 0x1000;
        /// Always locked after reset
        const POWERUP_LOCK = 0x2000;
    }
}

/// Where the MTD subsystem is found
#[derive(Debug, Clone)]
pub struct LinuxMtdConfig {
    /// Sysfs class directory (normally /sys/class/mtd)
    pub sysfs_root: PathBuf,
    /// Device node directory (normally /dev)
    pub dev_root: PathBuf,
}

impl Default for LinuxMtdConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from(MTD_SYSFS_ROOT),
            dev_root: PathBuf::from(DEV_ROOT),
        }
    }
}

/// Information about an MTD device read from sysfs
#[derive(Debug, Clone)]
pub struct MtdInfo {
    /// Device number (N in /dev/mtdN)
    pub dev_num: u32,
    /// Device name from sysfs
    pub name: String,
    /// Total size in bytes
    pub total_size: u64,
    /// Erase block size in bytes
    pub erase_size: u64,
    /// Number of erase regions (must be 0 for uniform erase)
    pub num_erase_regions: u64,
    /// Device flags
    pub flags: MtdFlags,
}

impl MtdInfo {
    /// Whether the device is writable
    pub fn is_writable(&self) -> bool {
        self.flags.contains(MtdFlags::WRITEABLE)
    }

    /// Whether the device requires erase before write
    pub fn requires_erase(&self) -> bool {
        !self.flags.contains(MtdFlags::NO_ERASE)
    }
}

/// The Linux MTD subsystem, one partition per /dev/mtdN
///
/// # Example
///
/// ```ignore
/// use fwflash_linux_mtd::{LinuxMtd, LinuxMtdConfig};
/// use fwflash_core::storage::StorageDevice;
///
/// let mtd = LinuxMtd::open(LinuxMtdConfig::default())?;
/// for index in mtd.partition_range()? {
///     println!("{}", mtd.partition_info(index)?.name);
/// }
/// ```
pub struct LinuxMtd {
    config: LinuxMtdConfig,
}

impl LinuxMtd {
    /// Attach to the MTD subsystem
    ///
    /// # Errors
    /// Returns [`LinuxMtdError::NotPresent`] if the sysfs class directory
    /// does not exist (kernel built without MTD support).
    pub fn open(config: LinuxMtdConfig) -> Result<Self> {
        if !config.sysfs_root.is_dir() {
            return Err(LinuxMtdError::NotPresent(
                config.sysfs_root.display().to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Sysfs directory of device `dev_num`
    fn sysfs_path(&self, dev_num: u32) -> String {
        format!("{}/mtd{}", self.config.sysfs_root.display(), dev_num)
    }

    /// Device node of device `dev_num`
    fn dev_path(&self, dev_num: u32) -> String {
        format!("{}/mtd{}", self.config.dev_root.display(), dev_num)
    }

    /// Device numbers present in sysfs, in ascending order
    pub fn device_numbers(&self) -> Result<Vec<u32>> {
        let root = &self.config.sysfs_root;
        let entries = std::fs::read_dir(root).map_err(|e| LinuxMtdError::ListFailed {
            path: root.display().to_string(),
            source: e,
        })?;

        let mut numbers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LinuxMtdError::ListFailed {
                path: root.display().to_string(),
                source: e,
            })?;
            // mtdN only; mtdNro are the read-only character devices
            if let Some(num) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix("mtd"))
                .filter(|num| !num.is_empty() && num.bytes().all(|c| c.is_ascii_digit()))
                .and_then(|num| num.parse::<u32>().ok())
            {
                numbers.push(num);
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    /// Read the sysfs description of device `dev_num`
    pub fn mtd_info(&self, dev_num: u32) -> Result<MtdInfo> {
        read_mtd_info(&self.sysfs_path(dev_num), dev_num)
    }

    fn partition_geometry(&self, dev_num: u32) -> Result<PartitionInfo> {
        let info = self.mtd_info(dev_num)?;
        let out_of_range = |attr: &str, value: u64| LinuxMtdError::SysfsParse {
            path: format!("{}/{}", self.sysfs_path(dev_num), attr),
            value: value.to_string(),
        };

        let erase_size = u32::try_from(info.erase_size)
            .map_err(|_| out_of_range("erasesize", info.erase_size))?;
        let erase_count = match info.total_size.checked_div(info.erase_size) {
            Some(count) => {
                u32::try_from(count).map_err(|_| out_of_range("size", info.total_size))?
            }
            None => 0,
        };

        Ok(PartitionInfo {
            index: dev_num,
            name: info.name,
            size: info.total_size,
            erase_size,
            erase_count,
        })
    }

    fn open_partition(&self, dev_num: u32, mode: AccessMode) -> Result<MtdPartition> {
        let info = self.mtd_info(dev_num)?;

        if mode.can_write() {
            if !info.is_writable() {
                return Err(LinuxMtdError::NotWritable);
            }
            // Validate erase size is a power of 2
            if !info.erase_size.is_power_of_two() {
                return Err(LinuxMtdError::InvalidEraseSize(info.erase_size));
            }
            // Non-uniform erase regions are not supported
            if info.num_erase_regions != 0 {
                return Err(LinuxMtdError::NonUniformEraseRegions(
                    info.num_erase_regions,
                ));
            }
        }

        let path = self.dev_path(dev_num);
        let file = OpenOptions::new()
            .read(mode.can_read())
            .write(mode.can_write())
            .open(&path)
            .map_err(|e| LinuxMtdError::OpenFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!(
            "Opened {} ({:?}, name='{}', size={:#x}, erase_size={:#x})",
            path, mode, info.name, info.total_size, info.erase_size
        );

        Ok(MtdPartition { file, path, info })
    }
}

impl StorageDevice for LinuxMtd {
    type Partition = MtdPartition;

    fn partition_range(&self) -> fwflash_core::Result<RangeInclusive<u32>> {
        let numbers = self.device_numbers().map_err(|e| {
            fwflash_core::Error::device(self.config.sysfs_root.display().to_string(), e)
        })?;
        match (numbers.first(), numbers.last()) {
            (Some(&lowest), Some(&highest)) => Ok(lowest..=highest),
            _ => {
                warn!("No MTD devices found");
                Ok(1..=0)
            }
        }
    }

    fn partition_info(&self, index: u32) -> fwflash_core::Result<PartitionInfo> {
        self.partition_geometry(index)
            .map_err(|e| fwflash_core::Error::device(self.dev_path(index), e))
    }

    fn open(&self, index: u32, mode: AccessMode) -> fwflash_core::Result<MtdPartition> {
        self.open_partition(index, mode)
            .map_err(|e| fwflash_core::Error::device(self.dev_path(index), e))
    }
}

/// An open /dev/mtdN device node
pub struct MtdPartition {
    /// Device file handle
    file: File,
    /// Device node path
    path: String,
    /// Device information
    info: MtdInfo,
}

impl MtdPartition {
    /// Get the device information
    pub fn info(&self) -> &MtdInfo {
        &self.info
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| LinuxMtdError::SeekFailed { offset, source: e })?;
        self.file
            .read_exact(buf)
            .map_err(|e| LinuxMtdError::ReadFailed {
                offset,
                len: buf.len(),
                source: e,
            })
    }

    fn erase_blocks(&mut self, first_block: u32, count: u32) -> Result<()> {
        if !self.info.requires_erase() {
            // Device doesn't require erase (e.g., RAM-backed MTD)
            debug!("{}: erase not required, skipping", self.path);
            return Ok(());
        }

        let erase_size = self.info.erase_size;
        let first = u64::from(first_block);
        for block in first..first + u64::from(count) {
            let offset = block * erase_size;
            let erase_info = EraseInfo {
                start: u32::try_from(offset).map_err(|_| LinuxMtdError::OffsetOverflow(offset))?,
                length: erase_size as u32,
            };
            trace!("{}: erasing block #{} at {:#x}", self.path, block, offset);

            // SAFETY: We're calling an ioctl with a valid file descriptor and
            // a properly initialized EraseInfo struct
            unsafe {
                memerase(self.file.as_raw_fd(), &erase_info).map_err(|e| {
                    LinuxMtdError::EraseFailed {
                        offset: erase_info.start,
                        source: e,
                    }
                })?;
            }
        }

        info!("{}: erased {} blocks", self.path, count);
        Ok(())
    }

    fn write_block(&mut self, block: u32, data: &[u8]) -> Result<()> {
        if data.len() as u64 > self.info.erase_size {
            return Err(LinuxMtdError::WriteTooLarge {
                len: data.len(),
                erase_size: self.info.erase_size,
            });
        }

        let offset = block as u64 * self.info.erase_size;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| LinuxMtdError::SeekFailed { offset, source: e })?;

        let write_failed = |e| LinuxMtdError::WriteFailed {
            block,
            len: data.len(),
            source: e,
        };
        self.file.write_all(data).map_err(write_failed)?;
        self.file.flush().map_err(write_failed)
    }
}

impl Partition for MtdPartition {
    fn path(&self) -> &str {
        &self.path
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> fwflash_core::Result<()> {
        self.read_at(offset, buf)
            .map_err(|e| fwflash_core::Error::device(self.path.clone(), e))
    }

    fn erase(&mut self, first_block: u32, count: u32) -> fwflash_core::Result<()> {
        self.erase_blocks(first_block, count)
            .map_err(|e| fwflash_core::Error::device(self.path.clone(), e))
    }

    fn write(&mut self, block: u32, data: &[u8]) -> fwflash_core::Result<()> {
        self.write_block(block, data)
            .map_err(|e| fwflash_core::Error::device(self.path.clone(), e))
    }
}

/// Read a string from a sysfs file and sanitize it
fn read_sysfs_string(sysfs_path: &str, filename: &str) -> Result<String> {
    let path = format!("{}/{}", sysfs_path, filename);
    let content = std::fs::read_to_string(&path).map_err(|e| LinuxMtdError::SysfsRead {
        path: path.clone(),
        source: e,
    })?;

    // Sanitize: remove non-printable characters and trailing whitespace
    let sanitized: String = content
        .chars()
        .take_while(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();
    Ok(sanitized.trim_end().to_string())
}

/// Read an integer from a sysfs file
fn read_sysfs_int(sysfs_path: &str, filename: &str) -> Result<u64> {
    let value_str = read_sysfs_string(sysfs_path, filename)?;
    let path = format!("{}/{}", sysfs_path, filename);

    // Support hex (0x...) and decimal
    let value = if let Some(hex) = value_str
        .strip_prefix("0x")
        .or_else(|| value_str.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else {
        value_str.parse::<u64>()
    };

    value.map_err(|_| LinuxMtdError::SysfsParse {
        path,
        value: value_str,
    })
}

/// Read MTD device information from sysfs
fn read_mtd_info(sysfs_path: &str, dev_num: u32) -> Result<MtdInfo> {
    let flags = MtdFlags::from_bits_retain(read_sysfs_int(sysfs_path, "flags")?);
    let name = read_sysfs_string(sysfs_path, "name")?;
    let total_size = read_sysfs_int(sysfs_path, "size")?;
    let erase_size = read_sysfs_int(sysfs_path, "erasesize")?;
    let num_erase_regions = read_sysfs_int(sysfs_path, "numeraseregions")?;

    trace!(
        "mtd{}: name='{}', size={:#x}, erase_size={:#x}, flags={:?}",
        dev_num,
        name,
        total_size,
        erase_size,
        flags
    );

    Ok(MtdInfo {
        dev_num,
        name,
        total_size,
        erase_size,
        num_erase_regions,
        flags,
    })
}

/// MEMERASE ioctl argument structure
/// Matches struct erase_info_user from mtd/mtd-user.h
#[repr(C)]
struct EraseInfo {
    start: u32,
    length: u32,
}

// MEMERASE = _IOW('M', 2, struct erase_info_user)
nix::ioctl_write_ptr!(memerase, b'M', 2, EraseInfo);

#[cfg(test)]
mod tests {
    use super::*;
    use fwflash_core::card::{CardType, T100_FW_PARTITION_SIZE};
    use fwflash_core::flash::{self, NoProgress};
    use fwflash_core::serial::SerialNumber;
    use std::fs;
    use std::path::Path;

    const EB: u64 = 0x1000;

    /// Fake MTD tree: <tmp>/sys/mtdN/* and <tmp>/dev/mtdN
    struct FakeMtd {
        dir: tempfile::TempDir,
    }

    impl FakeMtd {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join("sys")).unwrap();
            fs::create_dir(dir.path().join("dev")).unwrap();
            Self { dir }
        }

        fn config(&self) -> LinuxMtdConfig {
            LinuxMtdConfig {
                sysfs_root: self.dir.path().join("sys"),
                dev_root: self.dir.path().join("dev"),
            }
        }

        fn add(&self, num: u32, name: &str, size: u64, flags: MtdFlags, contents: &[u8]) {
            let sys = self.dir.path().join("sys").join(format!("mtd{}", num));
            fs::create_dir(&sys).unwrap();
            write_attr(&sys, "name", &format!("{}\n", name));
            write_attr(&sys, "size", &format!("{}\n", size));
            write_attr(&sys, "erasesize", &format!("{}\n", EB));
            write_attr(&sys, "flags", &format!("{:#x}\n", flags.bits()));
            write_attr(&sys, "numeraseregions", "0\n");

            let mut data = vec![0xFFu8; size as usize];
            data[..contents.len()].copy_from_slice(contents);
            fs::write(self.dir.path().join("dev").join(format!("mtd{}", num)), data).unwrap();
        }

        fn contents(&self, num: u32) -> Vec<u8> {
            fs::read(self.dir.path().join("dev").join(format!("mtd{}", num))).unwrap()
        }
    }

    fn write_attr(dir: &Path, name: &str, value: &str) {
        fs::write(dir.join(name), value).unwrap();
    }

    #[test]
    fn test_not_present() {
        let fake = FakeMtd::new();
        let mut config = fake.config();
        config.sysfs_root = fake.dir.path().join("missing");
        assert!(matches!(
            LinuxMtd::open(config),
            Err(LinuxMtdError::NotPresent(_))
        ));
    }

    #[test]
    fn test_partition_range() {
        let fake = FakeMtd::new();
        let mtd = LinuxMtd::open(fake.config()).unwrap();
        assert!(mtd.partition_range().unwrap().is_empty());

        fake.add(2, "a", EB, MtdFlags::WRITEABLE, &[]);
        fake.add(10, "b", EB, MtdFlags::WRITEABLE, &[]);
        fs::create_dir(fake.dir.path().join("sys/mtd2ro")).unwrap();
        fs::create_dir(fake.dir.path().join("sys/mtdblock")).unwrap();

        assert_eq!(mtd.device_numbers().unwrap(), vec![2, 10]);
        assert_eq!(mtd.partition_range().unwrap(), 2..=10);
        // Indices inside the range without a device cannot be queried
        assert!(mtd.partition_info(5).is_err());
    }

    #[test]
    fn test_partition_info() {
        let fake = FakeMtd::new();
        fake.add(0, "mgb4-fw.0", 4 * EB, MtdFlags::WRITEABLE, &[]);
        let sys = fake.dir.path().join("sys/mtd0");
        write_attr(&sys, "size", "0x4000\n");

        let mtd = LinuxMtd::open(fake.config()).unwrap();
        let info = mtd.partition_info(0).unwrap();
        assert_eq!(info.name, "mgb4-fw.0");
        assert_eq!(info.size, 0x4000);
        assert_eq!(info.erase_size, 0x1000);
        assert_eq!(info.erase_count, 4);

        write_attr(&sys, "size", "lots\n");
        assert!(mtd.partition_info(0).is_err());
    }

    #[test]
    fn test_partition_info_out_of_range() {
        let fake = FakeMtd::new();
        fake.add(0, "mgb4-fw.0", EB, MtdFlags::WRITEABLE, &[]);
        let sys = fake.dir.path().join("sys/mtd0");
        let mtd = LinuxMtd::open(fake.config()).unwrap();

        // Erase size that does not fit 32 bits
        write_attr(&sys, "erasesize", "0x100000000\n");
        match mtd.partition_geometry(0) {
            Err(LinuxMtdError::SysfsParse { path, value }) => {
                assert!(path.ends_with("mtd0/erasesize"));
                assert_eq!(value, "4294967296");
            }
            other => panic!("unexpected result: {:?}", other.map(|info| info.erase_size)),
        }
        assert!(matches!(
            mtd.partition_info(0),
            Err(fwflash_core::Error::Device { .. })
        ));

        // Erase block count that does not fit 32 bits
        write_attr(&sys, "erasesize", "1\n");
        write_attr(&sys, "size", "0x100000000\n");
        assert!(matches!(
            mtd.partition_geometry(0),
            Err(LinuxMtdError::SysfsParse { .. })
        ));

        // Zero erase size reports no erase blocks
        write_attr(&sys, "erasesize", "0\n");
        let info = mtd.partition_info(0).unwrap();
        assert_eq!(info.erase_size, 0);
        assert_eq!(info.erase_count, 0);
    }

    #[test]
    fn test_read_write() {
        let fake = FakeMtd::new();
        fake.add(0, "p", 2 * EB, MtdFlags::WRITEABLE, &[1, 2, 3, 4]);
        let mtd = LinuxMtd::open(fake.config()).unwrap();

        let mut part = mtd.open(0, AccessMode::Read).unwrap();
        let mut buf = [0u8; 4];
        part.read(0, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert!(part.read(2 * EB, &mut buf).is_err());
        drop(part);

        let mut part = mtd.open(0, AccessMode::Write).unwrap();
        assert_eq!(part.info().dev_num, 0);
        assert_eq!(part.info().erase_size, EB);
        assert!(part.info().is_writable());
        assert!(part.info().requires_erase());
        part.write(1, &[0xAA, 0xBB]).unwrap();
        assert!(part.write(0, &vec![0; EB as usize + 1]).is_err());
        drop(part);

        let contents = fake.contents(0);
        assert_eq!(&contents[EB as usize..EB as usize + 3], &[0xAA, 0xBB, 0xFF]);
    }

    #[test]
    fn test_not_writable() {
        let fake = FakeMtd::new();
        fake.add(0, "p", EB, MtdFlags::empty(), &[]);
        let mtd = LinuxMtd::open(fake.config()).unwrap();

        assert!(mtd.open(0, AccessMode::Read).is_ok());
        match mtd.open(0, AccessMode::Write) {
            Err(fwflash_core::Error::Device { path, .. }) => assert!(path.ends_with("dev/mtd0")),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("read-only device opened for writing"),
        }
    }

    #[test]
    fn test_erase_ioctl_failure() {
        // MEMERASE on a regular file fails with ENOTTY
        let fake = FakeMtd::new();
        fake.add(0, "p", EB, MtdFlags::WRITEABLE, &[]);
        let mtd = LinuxMtd::open(fake.config()).unwrap();

        let mut part = mtd.open(0, AccessMode::Write).unwrap();
        assert!(matches!(
            part.erase(0, 1),
            Err(fwflash_core::Error::Device { .. })
        ));
    }

    #[test]
    fn test_catalog_and_program() {
        let fake = FakeMtd::new();
        let flags = MtdFlags::WRITEABLE | MtdFlags::NO_ERASE;
        fake.add(0, "bios", EB, flags, &[]);
        fake.add(1, "mgb4-fw.0", T100_FW_PARTITION_SIZE, flags, &[]);
        fake.add(2, "mgb4-data.0", EB, flags, &0x1234_FF00u32.to_le_bytes());

        let mtd = LinuxMtd::open(fake.config()).unwrap();
        let catalog = flash::build_catalog(&mtd).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].index, 1);
        assert_eq!(catalog[0].serial, SerialNumber(0x1234_FF00));
        assert_eq!(catalog[0].card_type, CardType::T100);

        let payload: Vec<u8> = (0..(EB as usize * 2 + 5)).map(|i| i as u8).collect();
        let index = flash::select(&catalog, Some(SerialNumber(0x1234_FF00)), CardType::T100).unwrap();
        flash::program(&mtd, index, &payload, &mut NoProgress).unwrap();
        flash::verify(&mtd, index, &payload, &mut NoProgress).unwrap();

        assert_eq!(&fake.contents(1)[..payload.len()], payload.as_slice());
    }
}
