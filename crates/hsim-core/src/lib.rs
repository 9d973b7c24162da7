#![no_std]
#[cfg(feature = "std")]
extern crate std;

/// Value of every byte in an erased (or never written) flash region.
pub const ERASED_BYTE: u8 = 0xFF;

/// Logical flash partition number.
///
/// The store never allocates these; callers pick one of the well-known
/// constants or any other integer via [`PartitionId::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(u32);

impl PartitionId {
    pub const BOOTLOADER: Self = Self(0);
    pub const APPLICATION: Self = Self(1);
    pub const ATE: Self = Self(2);
    pub const OTA_TEMP: Self = Self(3);
    pub const RF_FIRMWARE: Self = Self(4);
    pub const PARAMETER_1: Self = Self(5);
    pub const PARAMETER_2: Self = Self(6);
    pub const PARAMETER_3: Self = Self(7);
    pub const PARAMETER_4: Self = Self(8);
    pub const BT_FIRMWARE: Self = Self(9);
    pub const SPIFFS: Self = Self(10);
    pub const CUSTOM_1: Self = Self(11);
    pub const CUSTOM_2: Self = Self(12);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Human readable name for the well-known partitions.
    pub fn label(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "bootloader",
            1 => "application",
            2 => "ate",
            3 => "ota-temp",
            4 => "rf-firmware",
            5 => "parameter-1",
            6 => "parameter-2",
            7 => "parameter-3",
            8 => "parameter-4",
            9 => "bt-firmware",
            10 => "spiffs",
            11 => "custom-1",
            12 => "custom-2",
            _ => return None,
        };
        Some(name)
    }
}

impl From<u32> for PartitionId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl core::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.label() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Flash program step: a write can only clear bits.
/// `current` holds the region content on entry and the merged bytes on return.
pub fn program_bits(current: &mut [u8], data: &[u8]) {
    debug_assert_eq!(current.len(), data.len());
    for (cell, new) in current.iter_mut().zip(data) {
        *cell &= *new;
    }
}

/// Advances `cursor` by `len`, or `None` if the result leaves the 32-bit address space.
pub fn advance(cursor: u32, len: usize) -> Option<u32> {
    let len = u32::try_from(len).ok()?;
    cursor.checked_add(len)
}

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Backing region could not be opened or created.
    OpenFailure,
    /// A read or write against an opened region failed.
    IoFailure,
    /// Missing cursor, or an offset/length outside the 32-bit address space.
    InvalidArgument,
    /// Operation not valid in the current state (e.g. timer already running).
    InvalidState,
}

impl core::fmt::Display for SimError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SimError {}
