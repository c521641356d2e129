//! Kit protocol status codes

/// Status byte reported to the host in front of every kit response.
///
/// The device libraries own the ranges `0x00..=0xB4` (AES132) and
/// `0xD0..=0xF7` (SHA204 / ECC), so the kit's own codes live in `0xC0..=0xC5`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum KitStatus {
    /// The command completed.
    Success = 0x00,
    /// The selector or sub-command is not known.
    UnknownCommand = 0xC0,
    /// The received line did not fit into the receive buffer.
    RxOverflow = 0xC1,
    /// The response did not fit into the transmit buffer and was truncated.
    TxOverflow = 0xC2,
    /// A data load was missing or malformed.
    InvalidParams = 0xC3,
    /// The interface does not implement the requested function.
    InvalidIfFunction = 0xC4,
    /// No device was discovered at the requested index.
    NoDevice = 0xC5,
}

impl KitStatus {
    /// Raw wire value.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<KitStatus> for u8 {
    fn from(status: KitStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for KitStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(KitStatus::Success),
            0xC0 => Ok(KitStatus::UnknownCommand),
            0xC1 => Ok(KitStatus::RxOverflow),
            0xC2 => Ok(KitStatus::TxOverflow),
            0xC3 => Ok(KitStatus::InvalidParams),
            0xC4 => Ok(KitStatus::InvalidIfFunction),
            0xC5 => Ok(KitStatus::NoDevice),
            other => Err(other),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for KitStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            KitStatus::Success => defmt::write!(f, "Success"),
            KitStatus::UnknownCommand => defmt::write!(f, "UnknownCommand"),
            KitStatus::RxOverflow => defmt::write!(f, "RxOverflow"),
            KitStatus::TxOverflow => defmt::write!(f, "TxOverflow"),
            KitStatus::InvalidParams => defmt::write!(f, "InvalidParams"),
            KitStatus::InvalidIfFunction => defmt::write!(f, "InvalidIfFunction"),
            KitStatus::NoDevice => defmt::write!(f, "NoDevice"),
        }
    }
}
