//! File-backed partition flash.
//!
//! Every partition maps to one file under the configured root. Each call opens
//! the file, transfers, and drops the handle before returning, so nothing is
//! cached between calls and a second process (or the next boot) sees the same
//! bytes.

use std::fs::{File, OpenOptions, Permissions};
use std::io::{self, ErrorKind};
use std::os::unix::fs::{FileExt, OpenOptionsExt, PermissionsExt};
use std::path::PathBuf;

use log::{debug, error, warn};

use hsim_core::{advance, program_bits, PartitionId, SimError, SimResult, ERASED_BYTE};
use hsim_hal::FlashPartition;

const REGION_PREFIX: &str = "hsim_partition";

// Applied to owner/group rwx when a region file is first created.
const CREATE_UMASK: u32 = 0o111;

// Erase writes 0xFF in chunks of this size.
const ERASE_CHUNK: usize = 4096;

fn region_mode() -> u32 {
    (libc::S_IRWXU | libc::S_IRWXG) as u32 & !CREATE_UMASK
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashConfig {
    /// Directory holding the region files.
    pub root: PathBuf,
    /// Scope region names to the current process so parallel instances do not share flash.
    pub per_pid: bool,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self { root: PathBuf::from("."), per_pid: false }
    }
}

#[derive(Debug, Clone)]
pub struct FileFlash {
    config: FlashConfig,
    pid: u32,
}

impl FileFlash {
    pub fn new(config: FlashConfig) -> Self {
        Self { config, pid: std::process::id() }
    }

    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    pub fn region_path(&self, partition: PartitionId) -> PathBuf {
        let name = if self.config.per_pid {
            format!("{}_{}_{}.bin", REGION_PREFIX, self.pid, partition.raw())
        } else {
            format!("{}_{}.bin", REGION_PREFIX, partition.raw())
        };
        self.config.root.join(name)
    }

    /// Opens the region, creating it on first access.
    fn open_region(&self, partition: PartitionId, for_write: bool) -> SimResult<File> {
        let path = self.region_path(partition);

        if let Ok(file) = OpenOptions::new().read(true).write(for_write).open(&path) {
            return Ok(file);
        }

        let mode = region_mode();
        match OpenOptions::new().write(true).create_new(true).mode(mode).open(&path) {
            Ok(file) => {
                // The process umask may have stripped more than CREATE_UMASK.
                if let Err(e) = file.set_permissions(Permissions::from_mode(mode)) {
                    warn!("could not set mode {:o} on {}: {}", mode, path.display(), e);
                }
                debug!("created flash region {} for partition {}", path.display(), partition);
            }
            // Someone else got there first.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                error!("error creating flash region {}: {}", path.display(), e);
                return Err(SimError::OpenFailure);
            }
        }

        OpenOptions::new().read(true).write(true).open(&path).map_err(|e| {
            error!("error opening flash region {}: {}", path.display(), e);
            SimError::OpenFailure
        })
    }
}

/// Reads until `buf` is full or EOF. Bytes past EOF are left untouched.
fn read_full_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read_at(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Writes erased cells over `[from, to)`.
fn fill_erased(file: &File, from: u64, to: u64) -> io::Result<()> {
    let block = [ERASED_BYTE; ERASE_CHUNK];
    let mut at = from;
    while at < to {
        let n = (to - at).min(ERASE_CHUNK as u64) as usize;
        file.write_all_at(&block[..n], at)?;
        at += n as u64;
    }
    Ok(())
}

/// Grows the region up to `offset` with erased cells, so no file hole
/// (which reads back as zeros) is left between the old end and `offset`.
fn extend_erased(file: &File, offset: u64) -> io::Result<()> {
    let end = file.metadata()?.len();
    if offset > end {
        fill_erased(file, end, offset)?;
    }
    Ok(())
}

impl FlashPartition for FileFlash {
    fn read(&self, partition: PartitionId, cursor: Option<&mut u32>, buf: &mut [u8]) -> SimResult<usize> {
        let cursor = cursor.ok_or(SimError::InvalidArgument)?;
        let file = self.open_region(partition, false)?;

        // Never move the cursor past the 32-bit address space.
        let room = (u32::MAX - *cursor) as usize;
        let len = buf.len().min(room);

        buf.fill(ERASED_BYTE);
        let n = read_full_at(&file, &mut buf[..len], u64::from(*cursor)).map_err(|e| {
            error!("error reading flash partition {}: {}", partition, e);
            SimError::IoFailure
        })?;

        *cursor += n as u32;
        Ok(n)
    }

    fn write(&mut self, partition: PartitionId, cursor: &mut u32, data: &[u8]) -> SimResult<()> {
        let next = advance(*cursor, data.len()).ok_or(SimError::InvalidArgument)?;
        let file = self.open_region(partition, true)?;
        if data.is_empty() {
            return Ok(());
        }
        let offset = u64::from(*cursor);

        // 1. Current content; the unwritten tail stays erased.
        let mut scratch = vec![ERASED_BYTE; data.len()];
        read_full_at(&file, &mut scratch, offset).map_err(|e| {
            error!("error reading flash partition {}: {}", partition, e);
            SimError::IoFailure
        })?;

        // 2. Program
        program_bits(&mut scratch, data);

        // 3. Commit the whole merged range, erasing any gap before it
        extend_erased(&file, offset)
            .and_then(|_| file.write_all_at(&scratch, offset))
            .map_err(|e| {
                error!("error writing flash partition {}: {}", partition, e);
                SimError::IoFailure
            })?;

        *cursor = next;
        Ok(())
    }

    fn erase(&mut self, partition: PartitionId, offset: u32, len: u32) -> SimResult<()> {
        advance(offset, len as usize).ok_or(SimError::InvalidArgument)?;
        let file = self.open_region(partition, true)?;
        if len == 0 {
            return Ok(());
        }
        let from = u64::from(offset);

        extend_erased(&file, from)
            .and_then(|_| fill_erased(&file, from, from + u64::from(len)))
            .map_err(|e| {
                error!("error erasing flash partition {}: {}", partition, e);
                SimError::IoFailure
            })
    }
}
