//! CryptoAuthentication device access.
//!
//! The physical link (I2C, SWI, ...) is provided by the board through the
//! [`CryptoInterface`] trait. On top of it this module builds:
//!
//! - [`opcode`]: the per-opcode command table (response sizes, execution times)
//! - [`crc`]: the device packet CRC
//! - [`transport`]: wake / send / delay / receive / idle sequencing
//! - [`discovery`]: bus scan filling the [`DeviceInfo`] table
//! - [`pubkey`]: public key export as PEM
//!
//! # Packets
//!
//! Every command and response is counted: byte 0 holds the total length
//! including the count byte itself and the two CRC bytes.
//!
//! ```text
//! command   [ count | opcode | param1 | param2 (LE) | data ... | crc (LE) ]
//! response  [ count | data ... | crc (LE) ]
//! ```

#![deny(unsafe_code)]

pub mod crc;
pub mod discovery;
pub mod opcode;
pub mod pubkey;
pub mod transport;

pub use discovery::{discover, DeviceTable, DISCOVER_DEVICE_COUNT_MAX};
pub use opcode::{command_info, Command, CommandInfo};
pub use transport::Transport;

/// Largest command packet the kit forwards to a device.
pub const COMMAND_SIZE_MAX: usize = 151;

/// Largest response packet a device returns.
pub const DEVICE_RESPONSE_MAX: usize = 100;

/// Bus a device was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BusType {
    /// Not discovered.
    #[default]
    Unknown = 0,
    /// SPI.
    Spi = 1,
    /// I2C (called TWI by the host tools).
    I2c = 2,
    /// Single-wire interface.
    Swi = 3,
    /// UART.
    Uart = 4,
}

impl BusType {
    /// Interface name reported by the board discovery command.
    pub const fn kit_name(self) -> &'static str {
        match self {
            BusType::Unknown => "no_device ",
            BusType::Spi => "SPI ",
            BusType::I2c => "TWI ",
            BusType::Swi => "SWI ",
            BusType::Uart => "UART ",
        }
    }
}

/// Device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    /// Unknown device.
    #[default]
    Unknown,
    /// CM, not supported.
    Cm,
    /// CRF, not supported.
    Crf,
    /// CMC, not supported.
    Cmc,
    /// SA100S, discoverable but not supported.
    Sa100s,
    /// SA102S, discoverable but not supported.
    Sa102s,
    /// SA10HS, discoverable but not supported.
    Sa10hs,
    /// SHA204.
    Sha204,
    /// AES132.
    Aes132,
    /// ECC108.
    Ecc108,
    /// ECC108A.
    Ecc108a,
    /// ECC508A.
    Ecc508a,
    /// ECC608A.
    Ecc608a,
}

impl DeviceType {
    /// Classify an ECC device from the revision returned by the Info command.
    pub const fn from_ecc_revision(revision: &[u8; 4]) -> Self {
        match revision[2] {
            0x50 => DeviceType::Ecc508a,
            0x60 => DeviceType::Ecc608a,
            _ => DeviceType::Ecc108a,
        }
    }

    /// Name reported by the board discovery command.
    pub const fn kit_name(self) -> &'static str {
        match self {
            DeviceType::Unknown => BusType::Unknown.kit_name(),
            DeviceType::Sha204 => "SHA204 ",
            DeviceType::Aes132 => "AES132 ",
            DeviceType::Ecc108
            | DeviceType::Ecc108a
            | DeviceType::Ecc508a
            | DeviceType::Ecc608a => "ECC108 ",
            _ => "unknown_device",
        }
    }
}

/// A discovered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Bus the device answered on.
    pub bus_type: BusType,
    /// Device family.
    pub device_type: DeviceType,
    /// I2C address (8-bit form) or selector byte.
    pub address: u8,
    /// GPIO index for SWI and SPI devices.
    pub device_index: u8,
    /// Revision bytes from the Info command.
    pub revision: [u8; 4],
}

impl DeviceInfo {
    /// The byte identifying the device on its bus: the address on I2C, the
    /// GPIO index otherwise.
    pub const fn selector(&self) -> u8 {
        match self.bus_type {
            BusType::I2c => self.address,
            _ => self.device_index,
        }
    }
}

/// Failure reported by the device library or the physical interface.
///
/// The codes are forwarded to the host verbatim as the response status.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DeviceError {
    /// Wake token was not acknowledged.
    WakeFailed,
    /// Response could not be parsed.
    ParseError,
    /// Device reported a CRC error on the received command.
    StatusCrc,
    /// Generic function failure.
    FuncFail,
    /// Invalid parameter.
    BadParam,
    /// Wrong packet size.
    InvalidSize,
    /// Response CRC mismatch.
    RxCrcError,
    /// Receive failed.
    RxFail,
    /// No response received.
    RxNoResponse,
    /// Transmit timed out.
    TxTimeout,
    /// Receive timed out.
    RxTimeout,
    /// Buffer too small.
    SmallBuffer,
    /// Communication failure.
    CommFail,
    /// Operation timed out.
    Timeout,
    /// Opcode not supported by the device.
    BadOpcode,
    /// Device reported an execution error.
    ExecutionError,
    /// Transmit failed.
    TxFail,
    /// No device found.
    NoDevices,
    /// Any other library status.
    Other(u8),
}

impl DeviceError {
    /// Library status code.
    pub const fn code(self) -> u8 {
        match self {
            DeviceError::WakeFailed => 0xD0,
            DeviceError::ParseError => 0xD2,
            DeviceError::StatusCrc => 0xD4,
            DeviceError::FuncFail => 0xE0,
            DeviceError::BadParam => 0xE2,
            DeviceError::InvalidSize => 0xE4,
            DeviceError::RxCrcError => 0xE5,
            DeviceError::RxFail => 0xE6,
            DeviceError::RxNoResponse => 0xE7,
            DeviceError::TxTimeout => 0xEA,
            DeviceError::RxTimeout => 0xEB,
            DeviceError::SmallBuffer => 0xED,
            DeviceError::CommFail => 0xF0,
            DeviceError::Timeout => 0xF1,
            DeviceError::BadOpcode => 0xF2,
            DeviceError::ExecutionError => 0xF4,
            DeviceError::TxFail => 0xF7,
            DeviceError::NoDevices => 0xF9,
            DeviceError::Other(code) => code,
        }
    }
}

impl From<DeviceError> for u8 {
    fn from(err: DeviceError) -> Self {
        err.code()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            DeviceError::WakeFailed => defmt::write!(f, "WakeFailed"),
            DeviceError::ParseError => defmt::write!(f, "ParseError"),
            DeviceError::StatusCrc => defmt::write!(f, "StatusCrc"),
            DeviceError::FuncFail => defmt::write!(f, "FuncFail"),
            DeviceError::BadParam => defmt::write!(f, "BadParam"),
            DeviceError::InvalidSize => defmt::write!(f, "InvalidSize"),
            DeviceError::RxCrcError => defmt::write!(f, "RxCrcError"),
            DeviceError::RxFail => defmt::write!(f, "RxFail"),
            DeviceError::RxNoResponse => defmt::write!(f, "RxNoResponse"),
            DeviceError::TxTimeout => defmt::write!(f, "TxTimeout"),
            DeviceError::RxTimeout => defmt::write!(f, "RxTimeout"),
            DeviceError::SmallBuffer => defmt::write!(f, "SmallBuffer"),
            DeviceError::CommFail => defmt::write!(f, "CommFail"),
            DeviceError::Timeout => defmt::write!(f, "Timeout"),
            DeviceError::BadOpcode => defmt::write!(f, "BadOpcode"),
            DeviceError::ExecutionError => defmt::write!(f, "ExecutionError"),
            DeviceError::TxFail => defmt::write!(f, "TxFail"),
            DeviceError::NoDevices => defmt::write!(f, "NoDevices"),
            DeviceError::Other(code) => defmt::write!(f, "Other({=u8:#x})", code),
        }
    }
}

/// Physical link to a CryptoAuthentication device.
///
/// Implementations talk to the bus; sequencing, timing and packet sizing
/// live in [`Transport`].
pub trait CryptoInterface {
    /// Send the wake token and check the wake response.
    fn wake(&mut self) -> Result<(), DeviceError>;

    /// Put the device into idle mode, keeping its volatile state.
    fn idle(&mut self) -> Result<(), DeviceError>;

    /// Put the device to sleep, clearing its volatile state.
    fn sleep(&mut self) -> Result<(), DeviceError>;

    /// Send a command frame.
    ///
    /// `frame[0]` is a reserved prefix slot the transport fills with the
    /// packet length; implementations may overwrite it with their word
    /// address. The counted packet follows from `frame[1]`.
    fn send(&mut self, frame: &mut [u8]) -> Result<(), DeviceError>;

    /// Receive up to `buf.len()` bytes, returning how many arrived.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError>;

    /// Address the interface currently talks to.
    fn address(&self) -> u8;

    /// Change the address the interface talks to.
    fn set_address(&mut self, address: u8);

    /// Bus this interface drives.
    fn bus_type(&self) -> BusType {
        BusType::I2c
    }

    /// Maximum execution time of `opcode` in milliseconds.
    ///
    /// Defaults to the ECC508A timings; override for other device families.
    fn execution_time_ms(&self, opcode: u8) -> Result<u32, DeviceError> {
        opcode::execution_time_ms(opcode).ok_or(DeviceError::BadOpcode)
    }
}
